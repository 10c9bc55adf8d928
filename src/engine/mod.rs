//! # Planning and execution engine
//!
//! The moving parts, in dependency order:
//!
//! | Component | Role |
//! |-----------|------|
//! | [`AgentContext`] | caller-owned shared state: knowledge, history, storage locations |
//! | [`RequirementAnalyzer`] | recursive requirement -> subtask decomposition |
//! | [`PriorityTaskQueue`] | priority-then-FIFO ordering of pending tasks |
//! | [`StorageOverflowManager`] | capacity checkpoints between subtasks |
//! | [`TaskExecutor`] | single-flow execution with boundary-only preemption |
//!
//! One task is in progress at a time; the inventory has a single writer.

mod analyzer;
mod context;
mod executor;
mod overflow;
mod queue;

pub use analyzer::{AnalyzeError, RequirementAnalyzer};
pub use context::AgentContext;
pub use executor::{
    ExecuteError, InterruptFlag, RunOutcome, SubtaskSummary, TaskExecutor, TaskStatusReport,
};
pub use overflow::{StashOutcome, StorageOverflowManager};
pub use queue::PriorityTaskQueue;
