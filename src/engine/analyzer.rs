//! Requirement analysis
//!
//! Expands an item/quantity requirement into the subtask list of a task:
//! craft recipes recurse into their ingredients, smeltable items grow a
//! smelt chain (ore gathering plus fuel), raw materials become gathers with
//! tool-upgrade gates. Recursion carries an explicit stack of in-flight
//! targets so mutually derivable items terminate, and a depth bound drops
//! pathological branches with a diagnostic instead of overflowing.
//!
//! Requesting the same material through different recipe branches never
//! duplicates work: a pending subtask for that material is raised to the
//! larger of the two quantities instead (and tool upgrades are unioned).

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{
    sort_into_execution_order, DependencyKey, GraphError, SubtaskAction, SubtaskId, Task,
};
use crate::knowledge::{tools, KnowledgeBase};

/// Smelt jobs one fuel unit is assumed to cover when sizing fuel gathers
const SMELTS_PER_FUEL: u32 = 8;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Plan for task '{name}' is not a valid dependency graph: {source}")]
    InvalidGraph {
        name: String,
        #[source]
        source: GraphError,
    },
}

/// Expands requirements into subtask plans against a knowledge base
pub struct RequirementAnalyzer<'a> {
    knowledge: &'a KnowledgeBase,
    max_depth: usize,
}

impl<'a> RequirementAnalyzer<'a> {
    pub fn new(knowledge: &'a KnowledgeBase) -> Self {
        Self {
            knowledge,
            max_depth: 16,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Builds a fully decomposed, dependency-ordered task.
    ///
    /// Rejects the plan before it can enter any queue if the produced
    /// dependency graph is not a DAG.
    pub fn build_task(
        &self,
        name: impl Into<String>,
        requirements: HashMap<String, u32>,
        priority: i32,
        inventory: &HashMap<String, u32>,
    ) -> Result<Task, AnalyzeError> {
        let mut task = Task::new(name, requirements.clone(), priority);

        // Requirement maps are unordered; expand deterministically.
        let mut items: Vec<(&String, &u32)> = requirements.iter().collect();
        items.sort_by(|a, b| a.0.cmp(b.0));

        for (item, quantity) in items {
            self.analyze_into(&mut task, inventory, item, *quantity);
        }

        sort_into_execution_order(&mut task.subtasks).map_err(|source| {
            AnalyzeError::InvalidGraph {
                name: task.name.clone(),
                source,
            }
        })?;
        task.refresh_progress();
        Ok(task)
    }

    /// Expands one requirement into `task.subtasks` in place
    pub fn analyze_into(
        &self,
        task: &mut Task,
        inventory: &HashMap<String, u32>,
        item: &str,
        quantity: u32,
    ) -> Option<SubtaskId> {
        let mut stack = Vec::new();
        self.expand(task, inventory, item, quantity, &mut stack, 0)
    }

    /// Returns the ID of the subtask that satisfies this requirement, or
    /// None when inventory already covers it (or the branch was dropped).
    fn expand(
        &self,
        task: &mut Task,
        inventory: &HashMap<String, u32>,
        item: &str,
        quantity: u32,
        stack: &mut Vec<String>,
        depth: usize,
    ) -> Option<SubtaskId> {
        let available = inventory.get(item).copied().unwrap_or(0);
        if available >= quantity {
            debug!(item, quantity, available, "requirement already satisfied");
            return None;
        }
        let needed = quantity - available;

        if depth >= self.max_depth {
            warn!(item, depth, "decomposition depth bound reached, dropping branch");
            return None;
        }
        if stack.iter().any(|entry| entry == item) {
            debug!(item, "mutually derivable target, breaking expansion cycle");
            return None;
        }

        stack.push(item.to_string());
        let result = self.expand_needed(task, inventory, item, needed, stack, depth);
        stack.pop();
        result
    }

    fn expand_needed(
        &self,
        task: &mut Task,
        inventory: &HashMap<String, u32>,
        item: &str,
        needed: u32,
        stack: &mut Vec<String>,
        depth: usize,
    ) -> Option<SubtaskId> {
        if let Some(recipe) = self.knowledge.recipe(item).cloned() {
            let batches = recipe.batches_for(needed);

            // Ingredients are created (or merged) before the craft so that
            // dependency edges point from the craft to its inputs.
            let mut deps = Vec::new();
            for (ingredient, per_batch) in &recipe.ingredients {
                if let Some(dep) =
                    self.expand(task, inventory, ingredient, per_batch * batches, stack, depth + 1)
                {
                    deps.push(DependencyKey::Id(dep));
                }
            }

            let craft_id = match task.pending_craft_mut(item) {
                Some(existing) => {
                    if let SubtaskAction::Craft { quantity, .. } = &mut existing.action {
                        *quantity = (*quantity).max(needed);
                    }
                    for dep in deps {
                        if !existing.dependencies.contains(&dep) {
                            existing.dependencies.push(dep);
                        }
                    }
                    existing.id.clone()
                }
                None => task.push_subtask(
                    SubtaskAction::Craft {
                        item: item.to_string(),
                        quantity: needed,
                    },
                    deps,
                ),
            };

            // An item that is both craftable and smeltable (an ingot from
            // ore) additionally gets the smelt chain.
            if let Some(input) = self.knowledge.smelt_input(item).map(str::to_string) {
                self.push_smelt_chain(task, inventory, item, &input, needed, stack, depth);
            }

            return Some(craft_id);
        }

        if let Some(input) = self.knowledge.smelt_input(item).map(str::to_string) {
            return self.push_smelt_chain(task, inventory, item, &input, needed, stack, depth);
        }

        if self.knowledge.source_block(item).is_some() {
            return Some(self.push_gather(task, inventory, item, needed));
        }

        warn!(item, "unknown item: no recipe, smelt source or block source");
        None
    }

    /// Appends (or merges) a GATHER subtask, gated on a tool upgrade when the
    /// source block is infeasible for the current tool set
    fn push_gather(
        &self,
        task: &mut Task,
        inventory: &HashMap<String, u32>,
        item: &str,
        needed: u32,
    ) -> SubtaskId {
        if let Some(existing) = task.pending_gather_mut(item) {
            if let SubtaskAction::Gather { quantity, .. } = &mut existing.action {
                *quantity = (*quantity).max(needed);
            }
            return existing.id.clone();
        }

        let block = self
            .knowledge
            .source_block(item)
            .unwrap_or(item)
            .to_string();

        let mut deps = Vec::new();
        if !tools::can_perform(&block, inventory) {
            if let Some(tool) = tools::minimal_required_tool(&block) {
                debug!(item, block, tool, "source block gated behind tool upgrade");
                let upgrade_id = match task.pending_tool_upgrade_mut(&tool) {
                    Some(existing) => existing.id.clone(),
                    None => task.push_subtask(SubtaskAction::ToolUpgrade { tool }, Vec::new()),
                };
                deps.push(DependencyKey::Id(upgrade_id));
            }
        }

        task.push_subtask(
            SubtaskAction::Gather {
                item: item.to_string(),
                quantity: needed,
            },
            deps,
        )
    }

    /// Appends (or merges) a SMELT chain: gather the furnace input, gather
    /// fuel when none is held, then smelt
    fn push_smelt_chain(
        &self,
        task: &mut Task,
        inventory: &HashMap<String, u32>,
        output: &str,
        input: &str,
        needed: u32,
        stack: &mut Vec<String>,
        depth: usize,
    ) -> Option<SubtaskId> {
        if let Some(existing) = task.pending_smelt_mut(output) {
            if let SubtaskAction::Smelt { quantity, .. } = &mut existing.action {
                *quantity = (*quantity).max(needed);
            }
            return Some(existing.id.clone());
        }

        let mut deps = Vec::new();

        // One furnace input per output item.
        if let Some(ore_dep) = self.expand(task, inventory, input, needed, stack, depth + 1) {
            deps.push(DependencyKey::Id(ore_dep));
        }

        if self.knowledge.held_fuel(inventory).is_none() {
            let fuel_item = self.knowledge.primary_fuel().to_string();
            let fuel_quantity = needed.div_ceil(SMELTS_PER_FUEL).max(1);
            let fuel_id = match task.pending_fuel_gather_mut(&fuel_item) {
                Some(existing) => {
                    if let SubtaskAction::GatherFuel { quantity, .. } = &mut existing.action {
                        *quantity = (*quantity).max(fuel_quantity);
                    }
                    existing.id.clone()
                }
                None => task.push_subtask(
                    SubtaskAction::GatherFuel {
                        item: fuel_item,
                        quantity: fuel_quantity,
                    },
                    Vec::new(),
                ),
            };
            deps.push(DependencyKey::Id(fuel_id));
        }

        Some(task.push_subtask(
            SubtaskAction::Smelt {
                input: input.to_string(),
                output: output.to_string(),
                quantity: needed,
            },
            deps,
        ))
    }
}
