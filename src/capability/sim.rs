//! Deterministic simulated world
//!
//! Backs the CLI and the test suite: a single inventory, an infinite world
//! for gathering, and scriptable failure points (denied gathers, capped
//! yields, forbidden placement) so execution paths can be exercised without
//! a live game server.

use std::collections::{HashMap, HashSet};

use super::{
    CapResult, Capabilities, CraftOutcome, DepositOutcome, GatherOutcome, PlaceOutcome, Position,
    SmeltOutcome, UpgradeOutcome,
};
use crate::knowledge::KnowledgeBase;

/// Items per inventory slot
const STACK_SIZE: u32 = 64;

/// Default number of carry slots
const DEFAULT_SLOTS: u32 = 36;

/// Smelt jobs one fuel unit covers
const SMELTS_PER_FUEL: u32 = 8;

#[derive(Debug, Clone)]
pub struct SimWorld {
    knowledge: KnowledgeBase,
    inventory: HashMap<String, u32>,
    slots: u32,
    denied_gathers: HashSet<String>,
    gather_caps: HashMap<String, u32>,
    denied_upgrades: HashSet<String>,
    failing_directs: HashSet<String>,
    containers: HashMap<Position, HashMap<String, u32>>,
    placement_allowed: bool,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self::with_knowledge(KnowledgeBase::standard())
    }

    pub fn with_knowledge(knowledge: KnowledgeBase) -> Self {
        Self {
            knowledge,
            inventory: HashMap::new(),
            slots: DEFAULT_SLOTS,
            denied_gathers: HashSet::new(),
            gather_caps: HashMap::new(),
            denied_upgrades: HashSet::new(),
            failing_directs: HashSet::new(),
            containers: HashMap::new(),
            placement_allowed: true,
        }
    }

    /// Adds `count` of `item` to the starting inventory
    pub fn grant(&mut self, item: &str, count: u32) -> &mut Self {
        *self.inventory.entry(item.to_string()).or_insert(0) += count;
        self
    }

    /// Makes every gather of `item` yield zero
    pub fn deny_gather(&mut self, item: &str) -> &mut Self {
        self.denied_gathers.insert(item.to_string());
        self
    }

    /// Caps each gather call for `item` at `max_per_call` units
    pub fn limit_gather(&mut self, item: &str, max_per_call: u32) -> &mut Self {
        self.gather_caps.insert(item.to_string(), max_per_call);
        self
    }

    /// Makes tool acquisition of `tool` fail
    pub fn deny_upgrade(&mut self, tool: &str) -> &mut Self {
        self.denied_upgrades.insert(tool.to_string());
        self
    }

    /// Makes the direct action `label` report failure
    pub fn fail_direct(&mut self, label: &str) -> &mut Self {
        self.failing_directs.insert(label.to_string());
        self
    }

    /// Shrinks or grows the carry capacity
    pub fn set_slots(&mut self, slots: u32) -> &mut Self {
        self.slots = slots;
        self
    }

    /// Pre-places a container in the world
    pub fn add_container(&mut self, position: Position) -> &mut Self {
        self.containers.entry(position).or_default();
        self
    }

    /// Forbids placing new containers anywhere
    pub fn forbid_placement(&mut self) -> &mut Self {
        self.placement_allowed = false;
        self
    }

    /// Contents of the container at `position`, if one exists
    pub fn container_contents(&self, position: &Position) -> Option<&HashMap<String, u32>> {
        self.containers.get(position)
    }

    fn used_slots(&self) -> u32 {
        self.inventory
            .values()
            .filter(|count| **count > 0)
            .map(|count| count.div_ceil(STACK_SIZE))
            .sum()
    }

    fn remove_items(&mut self, item: &str, count: u32) -> u32 {
        let held = self.inventory.entry(item.to_string()).or_insert(0);
        let taken = (*held).min(count);
        *held -= taken;
        taken
    }
}

impl Capabilities for SimWorld {
    fn gather(&mut self, item: &str, quantity: u32) -> CapResult<GatherOutcome> {
        if self.denied_gathers.contains(item) {
            return Ok(GatherOutcome { acquired: 0 });
        }

        let acquired = match self.gather_caps.get(item) {
            Some(cap) => quantity.min(*cap),
            None => quantity,
        };
        if acquired > 0 {
            self.grant(item, acquired);
        }
        Ok(GatherOutcome { acquired })
    }

    fn craft(&mut self, item: &str, quantity: u32) -> CapResult<CraftOutcome> {
        let Some(recipe) = self.knowledge.recipe(item).cloned() else {
            return Ok(CraftOutcome { crafted: 0 });
        };

        let wanted_batches = recipe.batches_for(quantity);
        let affordable = recipe
            .ingredients
            .iter()
            .map(|(ingredient, per_batch)| {
                self.inventory.get(ingredient).copied().unwrap_or(0) / per_batch.max(&1)
            })
            .min()
            .unwrap_or(0);
        let batches = wanted_batches.min(affordable);

        if batches > 0 {
            for (ingredient, per_batch) in &recipe.ingredients {
                self.remove_items(ingredient, per_batch * batches);
            }
            self.grant(item, recipe.output_count * batches);
        }

        Ok(CraftOutcome {
            crafted: recipe.output_count * batches,
        })
    }

    fn smelt(&mut self, input: &str, output: &str, quantity: u32) -> CapResult<SmeltOutcome> {
        let input_held = self.inventory.get(input).copied().unwrap_or(0);
        let jobs = quantity.min(input_held);
        if jobs == 0 {
            return Ok(SmeltOutcome { produced: 0 });
        }

        let inventory = self.inventory.clone();
        let Some(fuel) = self.knowledge.held_fuel(&inventory).map(str::to_string) else {
            return Ok(SmeltOutcome { produced: 0 });
        };

        let fuel_needed = jobs.div_ceil(SMELTS_PER_FUEL);
        self.remove_items(input, jobs);
        self.remove_items(&fuel, fuel_needed);
        self.grant(output, jobs);

        Ok(SmeltOutcome { produced: jobs })
    }

    fn upgrade_tool(&mut self, tool: &str) -> CapResult<UpgradeOutcome> {
        if self.denied_upgrades.contains(tool) {
            return Ok(UpgradeOutcome { acquired: false });
        }
        self.grant(tool, 1);
        Ok(UpgradeOutcome { acquired: true })
    }

    fn scan_storage(
        &mut self,
        radius: u32,
    ) -> CapResult<HashMap<Position, HashMap<String, u32>>> {
        Ok(self
            .containers
            .iter()
            .filter(|(pos, _)| pos.manhattan(&Position::ORIGIN) <= radius)
            .map(|(pos, contents)| (*pos, contents.clone()))
            .collect())
    }

    fn place_container(&mut self, position: Position) -> CapResult<PlaceOutcome> {
        let container_item = self.knowledge.container_item().to_string();
        if !self.placement_allowed || self.count_of(&container_item) == 0 {
            return Ok(PlaceOutcome { placed: false });
        }

        self.remove_items(&container_item, 1);
        self.containers.entry(position).or_default();
        Ok(PlaceOutcome { placed: true })
    }

    fn deposit(
        &mut self,
        position: Position,
        items: &HashMap<String, u32>,
    ) -> CapResult<DepositOutcome> {
        if !self.containers.contains_key(&position) {
            return Ok(DepositOutcome { stored: 0 });
        }

        let mut stored = 0;
        for (item, count) in items {
            let moved = self.remove_items(item, *count);
            if moved > 0 {
                let contents = self.containers.entry(position).or_default();
                *contents.entry(item.clone()).or_insert(0) += moved;
                stored += moved;
            }
        }
        Ok(DepositOutcome { stored })
    }

    fn inventory_snapshot(&self) -> HashMap<String, u32> {
        self.inventory
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(item, count)| (item.clone(), *count))
            .collect()
    }

    fn empty_capacity(&self) -> u32 {
        self.slots.saturating_sub(self.used_slots())
    }

    fn perform_direct(&mut self, label: &str) -> CapResult<bool> {
        Ok(!self.failing_directs.contains(label))
    }
}
