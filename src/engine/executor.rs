//! Task execution
//!
//! Pops the queue, drives a task's subtasks to completion or failure, and
//! honors the preemption contract: suspension is checked only at subtask
//! boundaries, never mid-capability-call, and a suspended task keeps every
//! subtask status exactly as it was.
//!
//! Exactly one task is in progress at a time; the single inventory is the
//! shared resource and gets a single writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::analyzer::{AnalyzeError, RequirementAnalyzer};
use super::context::AgentContext;
use super::overflow::StorageOverflowManager;
use super::queue::PriorityTaskQueue;
use crate::capability::Capabilities;
use crate::domain::{Progress, SubtaskAction, SubtaskStatus, Task, TaskId, TaskStatus};
use crate::storage::{EngineConfig, TaskRecord};

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("No suspended task with id {0}")]
    NotSuspended(TaskId),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
}

/// Cloneable handle the surrounding agent uses to request preemption.
///
/// The executor consumes the request at the next subtask boundary; an
/// in-flight capability call is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the executor to suspend the current task at the next boundary
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consumes a pending request
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Outcome of running one task to a stopping point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub task_id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub progress: Progress,
    pub completed: bool,
}

/// Status query payload for outward-facing consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatusReport {
    pub task_id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub subtasks: Vec<SubtaskSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtaskSummary {
    pub id: String,
    pub action: &'static str,
    pub target: String,
    pub quantity: u32,
    pub status: SubtaskStatus,
}

impl TaskStatusReport {
    fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            name: task.name.clone(),
            status: task.status,
            progress: task.progress,
            failure_reason: task.failure_reason.clone(),
            subtasks: task
                .subtasks
                .iter()
                .map(|s| SubtaskSummary {
                    id: s.id.to_string(),
                    action: s.action.label(),
                    target: s.action.target().to_string(),
                    quantity: s.action.quantity(),
                    status: s.status,
                })
                .collect(),
        }
    }
}

enum Fate {
    Completed,
    Failed(String),
    Suspended,
}

/// Drives tasks from the queue against a capability set
pub struct TaskExecutor<C: Capabilities> {
    caps: C,
    ctx: AgentContext,
    config: EngineConfig,
    queue: PriorityTaskQueue,
    suspended: Vec<Task>,
    archive: Vec<Task>,
    interrupt: InterruptFlag,
    overflow: StorageOverflowManager,
}

impl<C: Capabilities> TaskExecutor<C> {
    pub fn new(caps: C, ctx: AgentContext) -> Self {
        Self::with_config(caps, ctx, EngineConfig::new())
    }

    pub fn with_config(caps: C, ctx: AgentContext, config: EngineConfig) -> Self {
        let overflow = StorageOverflowManager::new(config.storage.clone());
        Self {
            caps,
            ctx,
            config,
            queue: PriorityTaskQueue::new(),
            suspended: Vec::new(),
            archive: Vec::new(),
            interrupt: InterruptFlag::new(),
            overflow,
        }
    }

    /// Handle for requesting suspension from the surrounding agent
    pub fn interrupt_handle(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    /// Alias for `interrupt_handle().request()`: suspend the in-progress
    /// task at its next subtask boundary
    pub fn request_suspend(&self) {
        self.interrupt.request();
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut AgentContext {
        &mut self.ctx
    }

    pub fn capabilities(&self) -> &C {
        &self.caps
    }

    pub fn capabilities_mut(&mut self) -> &mut C {
        &mut self.caps
    }

    pub fn queue(&self) -> &PriorityTaskQueue {
        &self.queue
    }

    pub fn suspended_tasks(&self) -> &[Task] {
        &self.suspended
    }

    pub fn archive(&self) -> &[Task] {
        &self.archive
    }

    /// Decomposes a requirement map into a task and enqueues it.
    ///
    /// An invalid dependency graph rejects the task here, before it ever
    /// enters the queue.
    pub fn submit(
        &mut self,
        name: impl Into<String>,
        requirements: HashMap<String, u32>,
        priority: i32,
    ) -> Result<TaskId, ExecuteError> {
        let analyzer = RequirementAnalyzer::new(&self.ctx.knowledge)
            .with_max_depth(self.config.max_decomposition_depth);
        let task = analyzer.build_task(
            name,
            requirements,
            priority,
            &self.caps.inventory_snapshot(),
        )?;

        info!(
            task = %task.id,
            name = %task.name,
            subtasks = task.subtasks.len(),
            priority,
            "task planned"
        );
        let id = task.id.clone();
        self.queue.enqueue(task);
        Ok(id)
    }

    /// Enqueues a direct task wrapping one opaque action
    pub fn submit_direct(
        &mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        priority: i32,
    ) -> TaskId {
        let task = Task::direct(name, label, priority);
        let id = task.id.clone();
        self.queue.enqueue(task);
        id
    }

    /// Enqueues an externally built task
    pub fn enqueue_task(&mut self, task: Task) {
        self.queue.enqueue(task);
    }

    /// Runs the highest-priority task to completion, failure, or suspension
    pub fn run_next(&mut self) -> Option<RunOutcome> {
        let mut task = self.queue.dequeue_highest()?;
        let started = Utc::now();
        task.start();
        info!(task = %task.id, name = %task.name, "task started");

        let fate = self.execute(&mut task);
        Some(self.settle(task, fate, started))
    }

    /// Runs queued tasks until the queue is empty (suspended tasks stay put)
    pub fn run_all(&mut self) -> Vec<RunOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.run_next() {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Moves a suspended task back to in-progress and continues from the
    /// first non-completed subtask
    pub fn resume(&mut self, task_id: &TaskId) -> Result<RunOutcome, ExecuteError> {
        let position = self
            .suspended
            .iter()
            .position(|t| &t.id == task_id)
            .ok_or_else(|| ExecuteError::NotSuspended(task_id.clone()))?;

        let mut task = self.suspended.remove(position);
        let started = Utc::now();
        task.resume();
        info!(
            task = %task.id,
            resume_at = ?task.first_incomplete_index(),
            "task resumed"
        );

        let fate = self.execute(&mut task);
        Ok(self.settle(task, fate, started))
    }

    /// Outward-facing status query across queue, suspended set, and archive
    pub fn task_status(&self, task_id: &TaskId) -> Option<TaskStatusReport> {
        self.queue
            .get(task_id)
            .or_else(|| self.suspended.iter().find(|t| &t.id == task_id))
            .or_else(|| self.archive.iter().find(|t| &t.id == task_id))
            .map(TaskStatusReport::from_task)
    }

    fn execute(&mut self, task: &mut Task) -> Fate {
        if let Some(direct) = task.direct.clone() {
            return match self.caps.perform_direct(&direct.label) {
                Ok(true) => Fate::Completed,
                Ok(false) => Fate::Failed(format!("direct action '{}' failed", direct.label)),
                Err(error) => Fate::Failed(error.to_string()),
            };
        }
        self.execute_subtasks(task)
    }

    /// Work-list scan over the stored order: each pass runs every ready
    /// subtask and revisits blocked ones; bounded by `len(subtasks)` passes
    /// since each pass must make progress or the task is stuck.
    fn execute_subtasks(&mut self, task: &mut Task) -> Fate {
        let max_passes = task.subtasks.len().max(1);

        for _pass in 0..max_passes {
            let mut progressed = false;

            for index in 0..task.subtasks.len() {
                if task.subtasks[index].status.is_complete() {
                    continue;
                }

                // Preemption is only honored here, between subtasks.
                if self.interrupt.take() {
                    info!(task = %task.id, "suspension requested, freezing at boundary");
                    return Fate::Suspended;
                }

                if !task.subtasks[index].is_ready(&task.subtasks) {
                    continue;
                }

                self.overflow
                    .check_and_handle(&mut self.caps, &mut self.ctx, &task.requirements);

                task.subtasks[index].status = SubtaskStatus::InProgress;
                let subtask = &task.subtasks[index];
                debug!(
                    task = %task.id,
                    subtask = %subtask.id,
                    action = subtask.action.label(),
                    target = subtask.action.target(),
                    "subtask started"
                );

                match dispatch_subtask(&mut self.caps, &task.subtasks[index].action) {
                    Ok(()) => {
                        task.subtasks[index].status = SubtaskStatus::Completed;
                        task.refresh_progress();
                        progressed = true;
                    }
                    Err(reason) => {
                        task.subtasks[index].status = SubtaskStatus::Failed;
                        task.refresh_progress();
                        warn!(task = %task.id, subtask = %task.subtasks[index].id, %reason, "subtask failed");
                        return Fate::Failed(reason);
                    }
                }
            }

            if task.subtasks.iter().all(|s| s.status.is_complete()) {
                return Fate::Completed;
            }
            if !progressed {
                return Fate::Failed("dependency deadlock: no ready subtask made progress".to_string());
            }
        }

        if task.subtasks.iter().all(|s| s.status.is_complete()) {
            Fate::Completed
        } else {
            Fate::Failed("subtask passes exhausted without completing".to_string())
        }
    }

    fn settle(
        &mut self,
        mut task: Task,
        fate: Fate,
        started: chrono::DateTime<Utc>,
    ) -> RunOutcome {
        match fate {
            Fate::Completed => {
                task.complete();
                info!(task = %task.id, name = %task.name, "task completed");
                self.archive_task(task, started)
            }
            Fate::Failed(reason) => {
                warn!(task = %task.id, name = %task.name, %reason, "task failed");
                task.fail(reason);
                self.archive_task(task, started)
            }
            Fate::Suspended => {
                task.suspend();
                let outcome = RunOutcome {
                    task_id: task.id.clone(),
                    name: task.name.clone(),
                    status: task.status,
                    progress: task.progress,
                    completed: false,
                };
                self.suspended.push(task);
                outcome
            }
        }
    }

    fn archive_task(&mut self, task: Task, started: chrono::DateTime<Utc>) -> RunOutcome {
        let duration_ms = (Utc::now() - started).num_milliseconds().max(0) as u64;
        self.ctx.record(TaskRecord {
            task_id: task.id.clone(),
            name: task.name.clone(),
            status: task.status,
            duration_ms,
            recorded_at: Utc::now(),
            failure_reason: task.failure_reason.clone(),
        });

        let outcome = RunOutcome {
            task_id: task.id.clone(),
            name: task.name.clone(),
            status: task.status,
            progress: task.progress,
            completed: task.status == TaskStatus::Completed,
        };
        self.archive.push(task);
        outcome
    }
}

/// Invokes the capability matching a subtask action and applies the success
/// contract: partial acquisition counts only when the inventory afterwards
/// meets the subtask's own need.
pub(crate) fn dispatch_subtask<C: Capabilities>(
    caps: &mut C,
    action: &SubtaskAction,
) -> Result<(), String> {
    match action {
        SubtaskAction::Gather { item, quantity } => match caps.gather(item, *quantity) {
            Ok(outcome) if outcome.acquired > 0 && caps.count_of(item) >= *quantity => Ok(()),
            Ok(outcome) => Err(format!(
                "gather {}: acquired {} of {}",
                item, outcome.acquired, quantity
            )),
            Err(error) => Err(error.to_string()),
        },
        SubtaskAction::Craft { item, quantity } => match caps.craft(item, *quantity) {
            Ok(outcome) if outcome.crafted > 0 && caps.count_of(item) >= *quantity => Ok(()),
            Ok(outcome) => Err(format!(
                "craft {}: produced {} of {}",
                item, outcome.crafted, quantity
            )),
            Err(error) => Err(error.to_string()),
        },
        SubtaskAction::Smelt {
            input,
            output,
            quantity,
        } => match caps.smelt(input, output, *quantity) {
            Ok(outcome) if outcome.produced > 0 && caps.count_of(output) >= *quantity => Ok(()),
            Ok(outcome) => Err(format!(
                "smelt {} -> {}: produced {} of {}",
                input, output, outcome.produced, quantity
            )),
            Err(error) => Err(error.to_string()),
        },
        SubtaskAction::ToolUpgrade { tool } => match caps.upgrade_tool(tool) {
            Ok(outcome) if outcome.acquired => Ok(()),
            Ok(_) => Err(format!("tool upgrade {}: not acquired", tool)),
            Err(error) => Err(error.to_string()),
        },
        SubtaskAction::GatherFuel { item, quantity } => match caps.gather(item, *quantity) {
            Ok(outcome) if outcome.acquired > 0 => Ok(()),
            Ok(_) => Err(format!("gather fuel {}: acquired nothing", item)),
            Err(error) => Err(error.to_string()),
        },
    }
}

/// Runs a nested plan's subtasks in order, without overflow checkpoints or
/// suspension; used for engine-internal provisioning plans.
pub(crate) fn run_plan_subtasks<C: Capabilities>(
    caps: &mut C,
    task: &mut Task,
) -> Result<(), String> {
    let max_passes = task.subtasks.len().max(1);

    for _pass in 0..max_passes {
        let mut progressed = false;

        for index in 0..task.subtasks.len() {
            if task.subtasks[index].status.is_complete() {
                continue;
            }
            if !task.subtasks[index].is_ready(&task.subtasks) {
                continue;
            }

            task.subtasks[index].status = SubtaskStatus::InProgress;
            match dispatch_subtask(caps, &task.subtasks[index].action) {
                Ok(()) => {
                    task.subtasks[index].status = SubtaskStatus::Completed;
                    progressed = true;
                }
                Err(reason) => {
                    task.subtasks[index].status = SubtaskStatus::Failed;
                    task.refresh_progress();
                    return Err(reason);
                }
            }
        }

        task.refresh_progress();
        if task.subtasks.iter().all(|s| s.status.is_complete()) {
            return Ok(());
        }
        if !progressed {
            return Err("dependency deadlock in nested plan".to_string());
        }
    }

    if task.subtasks.iter().all(|s| s.status.is_complete()) {
        Ok(())
    } else {
        Err("nested plan passes exhausted".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::SimWorld;
    use crate::domain::priority;

    fn executor() -> TaskExecutor<SimWorld> {
        TaskExecutor::new(SimWorld::new(), AgentContext::default())
    }

    fn req(items: &[(&str, u32)]) -> HashMap<String, u32> {
        items
            .iter()
            .map(|(item, count)| (item.to_string(), *count))
            .collect()
    }

    #[test]
    fn empty_queue_runs_nothing() {
        let mut exec = executor();
        assert!(exec.run_next().is_none());
    }

    #[test]
    fn completes_a_full_decomposition() {
        let mut exec = executor();
        let id = exec
            .submit("Stone pickaxe", req(&[("stone_pickaxe", 1)]), priority::NORMAL)
            .unwrap();

        let outcome = exec.run_next().unwrap();
        assert_eq!(outcome.task_id, id);
        assert!(outcome.completed);
        assert_eq!(outcome.status, TaskStatus::Completed);
        assert_eq!(outcome.progress.completed, outcome.progress.total);

        assert_eq!(exec.capabilities().count_of("stone_pickaxe"), 1);
        assert_eq!(exec.context().history().len(), 1);
        assert_eq!(exec.context().history()[0].status, TaskStatus::Completed);
    }

    #[test]
    fn failing_capability_fails_the_whole_task() {
        let mut world = SimWorld::new();
        world.deny_gather("cobblestone");
        let mut exec = TaskExecutor::new(world, AgentContext::default());

        let id = exec
            .submit("Stone pickaxe", req(&[("stone_pickaxe", 1)]), priority::NORMAL)
            .unwrap();
        let outcome = exec.run_next().unwrap();

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert!(!outcome.completed);

        let report = exec.task_status(&id).unwrap();
        assert!(report.failure_reason.is_some());

        // The craft depending on cobblestone never left PENDING.
        let craft = report
            .subtasks
            .iter()
            .find(|s| s.target == "stone_pickaxe")
            .unwrap();
        assert_eq!(craft.status, SubtaskStatus::Pending);
    }

    #[test]
    fn direct_task_invokes_single_action() {
        let mut exec = executor();
        exec.submit_direct("Patrol", "patrol_perimeter", priority::LOW);

        let outcome = exec.run_next().unwrap();
        assert!(outcome.completed);
    }

    #[test]
    fn failing_direct_task_is_failed() {
        let mut world = SimWorld::new();
        world.fail_direct("patrol_perimeter");
        let mut exec = TaskExecutor::new(world, AgentContext::default());
        exec.submit_direct("Patrol", "patrol_perimeter", priority::LOW);

        let outcome = exec.run_next().unwrap();
        assert_eq!(outcome.status, TaskStatus::Failed);
    }

    #[test]
    fn higher_priority_runs_first() {
        let mut exec = executor();
        exec.submit("Background", req(&[("cobblestone", 1)]), priority::LOW)
            .unwrap();
        let urgent = exec
            .submit("Urgent", req(&[("oak_log", 1)]), priority::CRITICAL)
            .unwrap();

        let first = exec.run_next().unwrap();
        assert_eq!(first.task_id, urgent);
    }

    #[test]
    fn completed_tasks_are_archived_not_requeued() {
        let mut exec = executor();
        exec.submit("Logs", req(&[("oak_log", 2)]), priority::NORMAL)
            .unwrap();

        assert_eq!(exec.run_all().len(), 1);
        assert!(exec.queue().is_empty());
        assert_eq!(exec.archive().len(), 1);
        assert!(exec.run_next().is_none());
    }

    #[test]
    fn status_query_covers_queued_and_archived() {
        let mut exec = executor();
        let id = exec
            .submit("Logs", req(&[("oak_log", 2)]), priority::NORMAL)
            .unwrap();

        let queued = exec.task_status(&id).unwrap();
        assert_eq!(queued.status, TaskStatus::Planned);

        exec.run_all();
        let archived = exec.task_status(&id).unwrap();
        assert_eq!(archived.status, TaskStatus::Completed);

        let unknown = TaskId::new("nope", Utc::now());
        assert!(exec.task_status(&unknown).is_none());
    }

    #[test]
    fn interrupt_before_run_suspends_at_first_boundary() {
        let mut exec = executor();
        let id = exec
            .submit("Stone pickaxe", req(&[("stone_pickaxe", 1)]), priority::NORMAL)
            .unwrap();

        exec.request_suspend();
        let outcome = exec.run_next().unwrap();

        assert_eq!(outcome.status, TaskStatus::Suspended);
        assert_eq!(outcome.progress.completed, 0);
        assert_eq!(exec.suspended_tasks().len(), 1);
        // Suspension is not a terminal outcome: nothing journaled yet.
        assert!(exec.context().history().is_empty());

        let resumed = exec.resume(&id).unwrap();
        assert!(resumed.completed);
        assert_eq!(exec.context().history().len(), 1);
    }

    #[test]
    fn resume_unknown_task_errors() {
        let mut exec = executor();
        let ghost = TaskId::new("ghost", Utc::now());
        assert!(matches!(
            exec.resume(&ghost),
            Err(ExecuteError::NotSuspended(_))
        ));
    }
}
