//! End-to-end engine scenarios
//!
//! Exercises the full pipeline (analyze -> enqueue -> execute) against the
//! simulated world, including preemption mid-task and capability failures.

use std::collections::HashMap;

use quarry::capability::{
    CapResult, Capabilities, CraftOutcome, DepositOutcome, GatherOutcome, PlaceOutcome, Position,
    SmeltOutcome, UpgradeOutcome,
};
use quarry::domain::{priority, SubtaskStatus, TaskStatus};
use quarry::engine::{AgentContext, InterruptFlag, TaskExecutor};
use quarry::{CompletionJournal, SimWorld};

fn requirements(items: &[(&str, u32)]) -> HashMap<String, u32> {
    items
        .iter()
        .map(|(item, count)| (item.to_string(), *count))
        .collect()
}

// =============================================================================
// Happy-path decomposition and execution
// =============================================================================

#[test]
fn stone_pickaxe_from_nothing_completes() {
    let mut exec = TaskExecutor::new(SimWorld::new(), AgentContext::default());
    let id = exec
        .submit(
            "Stone pickaxe",
            requirements(&[("stone_pickaxe", 1)]),
            priority::NORMAL,
        )
        .unwrap();

    let report = exec.task_status(&id).unwrap();
    let targets: Vec<&str> = report.subtasks.iter().map(|s| s.target.as_str()).collect();
    assert!(targets.contains(&"oak_log")); // wood precursor for sticks
    assert!(targets.contains(&"cobblestone"));
    assert_eq!(report.subtasks.last().unwrap().target, "stone_pickaxe");

    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Completed);
    assert_eq!(outcome.progress.completed, outcome.progress.total);
    assert_eq!(exec.capabilities().count_of("stone_pickaxe"), 1);
}

#[test]
fn satisfied_requirement_completes_with_zero_subtasks() {
    let mut world = SimWorld::new();
    world.grant("cobblestone", 10);
    let mut exec = TaskExecutor::new(world, AgentContext::default());

    let id = exec
        .submit("Stone check", requirements(&[("cobblestone", 8)]), priority::LOW)
        .unwrap();

    let report = exec.task_status(&id).unwrap();
    assert!(report.subtasks.is_empty());

    let outcome = exec.run_next().unwrap();
    assert!(outcome.completed);
    assert_eq!(outcome.progress.total, 0);
}

#[test]
fn smelting_chain_runs_upgrade_fuel_then_smelt() {
    let mut exec = TaskExecutor::new(SimWorld::new(), AgentContext::default());
    let id = exec
        .submit("Iron ingots", requirements(&[("iron_ingot", 2)]), priority::NORMAL)
        .unwrap();

    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Completed);
    assert!(exec.capabilities().count_of("iron_ingot") >= 2);

    // The upgrade landed the gating tool in the inventory.
    assert_eq!(exec.capabilities().count_of("stone_pickaxe"), 1);

    let report = exec.task_status(&id).unwrap();
    assert!(report.subtasks.iter().any(|s| s.action == "tool_upgrade"));
    assert!(report.subtasks.iter().any(|s| s.action == "gather_fuel"));
}

// =============================================================================
// Failure propagation
// =============================================================================

#[test]
fn failed_gather_fails_task_and_leaves_craft_pending() {
    let mut world = SimWorld::new();
    world.deny_gather("cobblestone");
    let mut exec = TaskExecutor::new(world, AgentContext::default());

    let id = exec
        .submit(
            "Stone pickaxe",
            requirements(&[("stone_pickaxe", 1)]),
            priority::NORMAL,
        )
        .unwrap();
    let outcome = exec.run_next().unwrap();

    assert_eq!(outcome.status, TaskStatus::Failed);
    assert!(!outcome.completed);

    let report = exec.task_status(&id).unwrap();
    assert!(report.failure_reason.is_some());

    let cobble = report
        .subtasks
        .iter()
        .find(|s| s.target == "cobblestone")
        .unwrap();
    assert_eq!(cobble.status, SubtaskStatus::Failed);

    // The terminal craft never left PENDING.
    let craft = report
        .subtasks
        .iter()
        .find(|s| s.target == "stone_pickaxe")
        .unwrap();
    assert_eq!(craft.status, SubtaskStatus::Pending);
}

#[test]
fn partial_gather_that_misses_the_need_fails() {
    let mut world = SimWorld::new();
    world.limit_gather("cobblestone", 1); // asks for 3, gets 1 per call
    let mut exec = TaskExecutor::new(world, AgentContext::default());

    exec.submit(
        "Stone pickaxe",
        requirements(&[("stone_pickaxe", 1)]),
        priority::NORMAL,
    )
    .unwrap();

    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Failed);
}

#[test]
fn partial_gather_that_meets_the_need_succeeds() {
    let mut world = SimWorld::new();
    world.grant("cobblestone", 2);
    world.limit_gather("cobblestone", 1); // needs 1 more, gets exactly 1
    let mut exec = TaskExecutor::new(world, AgentContext::default());

    exec.submit(
        "Stone pickaxe",
        requirements(&[("stone_pickaxe", 1)]),
        priority::NORMAL,
    )
    .unwrap();

    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Completed);
}

// =============================================================================
// Preemption
// =============================================================================

/// Delegates to SimWorld and raises the interrupt flag after a fixed number
/// of primitive calls, modeling a survival interrupt arriving mid-task.
struct InterruptingWorld {
    inner: SimWorld,
    calls: u32,
    interrupt_after: u32,
    flag: Option<InterruptFlag>,
}

impl InterruptingWorld {
    fn new(interrupt_after: u32) -> Self {
        Self {
            inner: SimWorld::new(),
            calls: 0,
            interrupt_after,
            flag: None,
        }
    }

    fn bump(&mut self) {
        self.calls += 1;
        if self.calls == self.interrupt_after {
            if let Some(flag) = &self.flag {
                flag.request();
            }
        }
    }
}

impl Capabilities for InterruptingWorld {
    fn gather(&mut self, item: &str, quantity: u32) -> CapResult<GatherOutcome> {
        let outcome = self.inner.gather(item, quantity);
        self.bump();
        outcome
    }

    fn craft(&mut self, item: &str, quantity: u32) -> CapResult<CraftOutcome> {
        let outcome = self.inner.craft(item, quantity);
        self.bump();
        outcome
    }

    fn smelt(&mut self, input: &str, output: &str, quantity: u32) -> CapResult<SmeltOutcome> {
        let outcome = self.inner.smelt(input, output, quantity);
        self.bump();
        outcome
    }

    fn upgrade_tool(&mut self, tool: &str) -> CapResult<UpgradeOutcome> {
        let outcome = self.inner.upgrade_tool(tool);
        self.bump();
        outcome
    }

    fn scan_storage(
        &mut self,
        radius: u32,
    ) -> CapResult<HashMap<Position, HashMap<String, u32>>> {
        self.inner.scan_storage(radius)
    }

    fn place_container(&mut self, position: Position) -> CapResult<PlaceOutcome> {
        self.inner.place_container(position)
    }

    fn deposit(
        &mut self,
        position: Position,
        items: &HashMap<String, u32>,
    ) -> CapResult<DepositOutcome> {
        self.inner.deposit(position, items)
    }

    fn inventory_snapshot(&self) -> HashMap<String, u32> {
        self.inner.inventory_snapshot()
    }

    fn empty_capacity(&self) -> u32 {
        self.inner.empty_capacity()
    }

    fn perform_direct(&mut self, label: &str) -> CapResult<bool> {
        self.inner.perform_direct(label)
    }
}

#[test]
fn suspension_round_trip_preserves_progress() {
    let world = InterruptingWorld::new(2);
    let mut exec = TaskExecutor::new(world, AgentContext::default());
    let flag = exec.interrupt_handle();
    exec.capabilities_mut().flag = Some(flag);

    // The stone pickaxe plan has 5 subtasks; the interrupt arrives after 2.
    let id = exec
        .submit(
            "Stone pickaxe",
            requirements(&[("stone_pickaxe", 1)]),
            priority::NORMAL,
        )
        .unwrap();

    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Suspended);
    assert_eq!(outcome.progress.completed, 2);
    assert_eq!(outcome.progress.total, 5);

    // Frozen exactly as they were: first two completed, rest pending.
    let report = exec.task_status(&id).unwrap();
    let statuses: Vec<SubtaskStatus> = report.subtasks.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SubtaskStatus::Completed,
            SubtaskStatus::Completed,
            SubtaskStatus::Pending,
            SubtaskStatus::Pending,
            SubtaskStatus::Pending,
        ]
    );

    let calls_at_suspension = exec.capabilities().calls;
    let resumed = exec.resume(&id).unwrap();
    assert_eq!(resumed.status, TaskStatus::Completed);

    // Resume continued at subtask index 2: the first two were not re-run.
    assert_eq!(exec.capabilities().calls, calls_at_suspension + 3);
}

#[test]
fn never_resumed_task_just_stays_suspended() {
    let world = InterruptingWorld::new(1);
    let mut exec = TaskExecutor::new(world, AgentContext::default());
    let flag = exec.interrupt_handle();
    exec.capabilities_mut().flag = Some(flag);

    exec.submit(
        "Stone pickaxe",
        requirements(&[("stone_pickaxe", 1)]),
        priority::NORMAL,
    )
    .unwrap();

    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Suspended);
    assert_eq!(exec.suspended_tasks().len(), 1);

    // Nothing terminal was recorded and the queue is empty.
    assert!(exec.context().history().is_empty());
    assert!(exec.run_next().is_none());
}

// =============================================================================
// Priorities across tasks
// =============================================================================

#[test]
fn critical_interrupt_then_resume_background_work() {
    let world = InterruptingWorld::new(2);
    let mut exec = TaskExecutor::new(world, AgentContext::default());
    let flag = exec.interrupt_handle();
    exec.capabilities_mut().flag = Some(flag);

    let background = exec
        .submit(
            "Stone pickaxe",
            requirements(&[("stone_pickaxe", 1)]),
            priority::LOW,
        )
        .unwrap();

    // Background work suspends mid-flight...
    let outcome = exec.run_next().unwrap();
    assert_eq!(outcome.status, TaskStatus::Suspended);

    // ...a critical survival task jumps the queue and runs...
    let critical = exec.submit_direct("Flee", "retreat_to_shelter", priority::CRITICAL);
    let urgent = exec.run_next().unwrap();
    assert_eq!(urgent.task_id, critical);
    assert!(urgent.completed);

    // ...and the background task resumes with no lost progress.
    let resumed = exec.resume(&background).unwrap();
    assert_eq!(resumed.status, TaskStatus::Completed);
}

// =============================================================================
// Journal integration
// =============================================================================

#[test]
fn terminal_outcomes_land_in_the_journal() {
    let dir = tempfile::TempDir::new().unwrap();
    let journal_path = dir.path().join("journal.jsonl");

    let mut world = SimWorld::new();
    world.deny_gather("cobblestone");

    let ctx = AgentContext::default().with_journal(CompletionJournal::new(&journal_path));
    let mut exec = TaskExecutor::new(world, ctx);

    exec.submit("Logs", requirements(&[("oak_log", 2)]), priority::NORMAL)
        .unwrap();
    exec.submit(
        "Stone pickaxe",
        requirements(&[("stone_pickaxe", 1)]),
        priority::NORMAL,
    )
    .unwrap();
    exec.run_all();

    let records = CompletionJournal::new(&journal_path).read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].status, TaskStatus::Completed);
    assert_eq!(records[1].status, TaskStatus::Failed);
    assert!(records[1].failure_reason.is_some());
}
