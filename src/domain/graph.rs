//! Subtask dependency graph
//!
//! Validates the dependency edges of one task (DAG-ness, no dangling ID
//! references) and produces the dependency-respecting execution order.
//! Uses petgraph for graph operations.
//!
//! A dependency cycle is a construction error: the task is rejected before
//! it ever enters the queue, it is not a runtime retry condition.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use super::id::SubtaskId;
use super::task::{DependencyKey, Subtask};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Dependency cycle through subtask {0}")]
    CycleDetected(SubtaskId),

    #[error("Subtask {subtask} references unknown subtask {reference}")]
    DanglingDependency {
        subtask: SubtaskId,
        reference: SubtaskId,
    },

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(SubtaskId),
}

/// Dependency graph over the subtasks of a single task
///
/// Node weights are indices into the subtask slice the graph was built from;
/// edges point from a dependency to its dependent.
#[derive(Debug)]
pub struct SubtaskGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
}

impl SubtaskGraph {
    /// Builds and validates the graph for a subtask slice.
    ///
    /// Item-name keys that match no sibling are trivially satisfied (the
    /// material was covered by inventory) and produce no edge. ID keys that
    /// match no sibling are dangling references and reject the plan.
    pub fn build(subtasks: &[Subtask]) -> Result<Self, GraphError> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..subtasks.len()).map(|i| graph.add_node(i)).collect();

        for (dependent_idx, subtask) in subtasks.iter().enumerate() {
            for key in &subtask.dependencies {
                if let DependencyKey::Id(id) = key {
                    if id == &subtask.id {
                        return Err(GraphError::SelfDependency(subtask.id.clone()));
                    }
                }

                let mut matched = false;
                for (dep_idx, other) in subtasks.iter().enumerate() {
                    if dep_idx != dependent_idx && key.matches(other) {
                        matched = true;
                        graph.add_edge(nodes[dep_idx], nodes[dependent_idx], ());
                    }
                }

                if !matched {
                    if let DependencyKey::Id(id) = key {
                        return Err(GraphError::DanglingDependency {
                            subtask: subtask.id.clone(),
                            reference: id.clone(),
                        });
                    }
                }
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let idx = graph[cycle.node_id()];
            return Err(GraphError::CycleDetected(subtasks[idx].id.clone()));
        }

        Ok(Self { graph, nodes })
    }

    /// Subtask indices in execution order: no subtask precedes one it depends
    /// on; among otherwise-unordered siblings, higher action rank runs first,
    /// then creation order.
    pub fn execution_order(&self, subtasks: &[Subtask]) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self
            .nodes
            .iter()
            .map(|&n| {
                self.graph
                    .neighbors_directed(n, petgraph::Direction::Incoming)
                    .count()
            })
            .collect();

        let mut remaining: Vec<usize> = (0..subtasks.len()).collect();
        let mut order = Vec::with_capacity(subtasks.len());

        while !remaining.is_empty() {
            // Among ready subtasks pick the highest rank; remaining stays in
            // creation order, so the first of an equal-rank run wins.
            let mut pick: Option<usize> = None;
            for (pos, &i) in remaining.iter().enumerate() {
                if in_degree[i] != 0 {
                    continue;
                }
                match pick {
                    None => pick = Some(pos),
                    Some(p) => {
                        if subtasks[i].action.rank() > subtasks[remaining[p]].action.rank() {
                            pick = Some(pos);
                        }
                    }
                }
            }

            let Some(pos) = pick else {
                // Validated acyclic in build(); keep creation order if a
                // stale graph slips through.
                order.extend(remaining.drain(..));
                break;
            };

            let idx = remaining.remove(pos);
            order.push(idx);

            for neighbor in self
                .graph
                .neighbors_directed(self.nodes[idx], petgraph::Direction::Outgoing)
            {
                in_degree[self.graph[neighbor]] -= 1;
            }
        }

        order
    }

    /// Number of subtasks in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reorders `subtasks` in place into execution order, validating the graph.
pub fn sort_into_execution_order(subtasks: &mut Vec<Subtask>) -> Result<(), GraphError> {
    let graph = SubtaskGraph::build(subtasks)?;
    let order = graph.execution_order(subtasks);

    let mut reordered = Vec::with_capacity(subtasks.len());
    for idx in &order {
        reordered.push(subtasks[*idx].clone());
    }
    *subtasks = reordered;
    Ok(())
}

/// Returns true if every dependency's producer precedes its dependent in the
/// stored order.
pub fn is_topologically_valid(subtasks: &[Subtask]) -> bool {
    subtasks.iter().enumerate().all(|(i, subtask)| {
        subtask.dependencies.iter().all(|key| {
            subtasks
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && key.matches(other))
                .all(|(j, _)| j < i)
        })
    })
}
