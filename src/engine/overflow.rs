//! Storage overflow handling
//!
//! Watches carrying capacity before each subtask. When the free-slot
//! high-water mark is hit, surplus materials are stashed into an overflow
//! container: an existing one within the search radius if possible,
//! otherwise one provisioned through a nested gather-craft-place plan built
//! with the same analyzer and subtask runner as everything else. When
//! neither works, execution continues unstashed in a logged degraded mode.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::analyzer::RequirementAnalyzer;
use super::context::AgentContext;
use super::executor::run_plan_subtasks;
use crate::capability::{Capabilities, Position};
use crate::domain::priority;
use crate::knowledge::tools;
use crate::storage::StorageConfig;

/// What a capacity checkpoint did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashOutcome {
    /// Capacity is fine; nothing to do
    NotNeeded,
    /// Surplus moved into a container
    Stashed { position: Position, stored: u32 },
    /// Capacity exhausted but no container found or built; continuing anyway
    Degraded,
}

pub struct StorageOverflowManager {
    config: StorageConfig,
}

impl StorageOverflowManager {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Checkpoint run before each subtask. `keep` lists item quantities the
    /// current task still needs on hand; those never get stashed.
    pub fn check_and_handle<C: Capabilities>(
        &self,
        caps: &mut C,
        ctx: &mut AgentContext,
        keep: &HashMap<String, u32>,
    ) -> StashOutcome {
        if caps.empty_capacity() > self.config.min_free_slots {
            return StashOutcome::NotNeeded;
        }
        debug!(
            free = caps.empty_capacity(),
            high_water = self.config.min_free_slots,
            "carrying capacity at high-water mark"
        );

        if let Some(position) = self.locate_container(caps, ctx) {
            let stored = self.transfer_surplus(caps, position, keep);
            ctx.remember_container(position);
            info!(%position, stored, "stashed surplus into existing container");
            return StashOutcome::Stashed { position, stored };
        }

        if self.config.auto_place_container {
            if let Some(position) = self.provision_container(caps, ctx) {
                let stored = self.transfer_surplus(caps, position, keep);
                ctx.remember_container(position);
                info!(%position, stored, "stashed surplus into newly placed container");
                return StashOutcome::Stashed { position, stored };
            }
        }

        warn!("capacity exhausted and no overflow container available; continuing unstashed");
        StashOutcome::Degraded
    }

    /// A remembered container in range, or the nearest one a scan turns up
    fn locate_container<C: Capabilities>(
        &self,
        caps: &mut C,
        ctx: &AgentContext,
    ) -> Option<Position> {
        let radius = self.config.container_search_radius;

        if let Some(position) = ctx
            .known_containers()
            .iter()
            .find(|p| p.manhattan(&Position::ORIGIN) <= radius)
        {
            return Some(*position);
        }

        let scan = match caps.scan_storage(radius) {
            Ok(scan) => scan,
            Err(error) => {
                warn!(%error, "storage scan failed");
                return None;
            }
        };

        // Nearest first; ties broken by coordinates for determinism.
        scan.keys()
            .min_by_key(|p| (p.manhattan(&Position::ORIGIN), **p))
            .copied()
    }

    /// Builds and places a fresh container via a nested plan through the
    /// same machinery that runs ordinary tasks
    fn provision_container<C: Capabilities>(
        &self,
        caps: &mut C,
        ctx: &AgentContext,
    ) -> Option<Position> {
        let container = ctx.knowledge.container_item().to_string();

        if caps.count_of(&container) == 0 {
            let analyzer = RequirementAnalyzer::new(&ctx.knowledge);
            let mut plan = match analyzer.build_task(
                format!("Provision {}", container),
                HashMap::from([(container.clone(), 1)]),
                priority::HIGH,
                &caps.inventory_snapshot(),
            ) {
                Ok(plan) => plan,
                Err(error) => {
                    warn!(%error, "could not plan container provisioning");
                    return None;
                }
            };
            plan.start();

            if let Err(reason) = run_plan_subtasks(caps, &mut plan) {
                warn!(%reason, "container provisioning plan failed");
                return None;
            }
        }

        let position = Position::new(1, 0, 0);
        match caps.place_container(position) {
            Ok(outcome) if outcome.placed => Some(position),
            Ok(_) => {
                warn!(%position, "container placement refused");
                None
            }
            Err(error) => {
                warn!(%error, "container placement failed");
                None
            }
        }
    }

    /// Moves everything not needed soon (and no tool) into the container
    fn transfer_surplus<C: Capabilities>(
        &self,
        caps: &mut C,
        position: Position,
        keep: &HashMap<String, u32>,
    ) -> u32 {
        let mut surplus = HashMap::new();
        for (item, count) in caps.inventory_snapshot() {
            if tools::classify_tool(&item).is_some() {
                continue; // the tool belt stays
            }
            let keep_count = keep.get(&item).copied().unwrap_or(0);
            if count > keep_count {
                surplus.insert(item, count - keep_count);
            }
        }
        if surplus.is_empty() {
            return 0;
        }

        match caps.deposit(position, &surplus) {
            Ok(outcome) => outcome.stored,
            Err(error) => {
                warn!(%error, %position, "deposit into container failed");
                0
            }
        }
    }
}
