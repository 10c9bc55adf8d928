//! Quarry - hierarchical task decomposition and priority-preemptive execution
//!
//! Quarry turns a resource goal ("have N of item X") into an ordered graph of
//! primitive actions (gather, craft, smelt, upgrade tooling, acquire fuel)
//! and executes it under a priority discipline: urgent work preempts
//! background work at subtask boundaries without losing progress.
//!
//! The physical world sits behind the [`capability::Capabilities`] trait; a
//! deterministic [`capability::SimWorld`] ships for tests and the CLI.

pub mod capability;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod knowledge;
pub mod storage;

pub use capability::{Capabilities, SimWorld};
pub use domain::{priority, Subtask, SubtaskAction, SubtaskId, Task, TaskId, TaskStatus};
pub use engine::{
    AgentContext, InterruptFlag, PriorityTaskQueue, RequirementAnalyzer, TaskExecutor,
};
pub use knowledge::KnowledgeBase;
pub use storage::{CompletionJournal, EngineConfig, TaskRecord};
