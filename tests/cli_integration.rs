//! CLI integration tests
//!
//! Verifies the plan/run/history commands end to end against the simulated
//! world, in both text and JSON output modes.

use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command instance for the quarry binary
fn quarry_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("quarry"))
}

// =============================================================================
// Plan
// =============================================================================

#[test]
fn test_plan_prints_decomposition() {
    quarry_cmd()
        .args(["plan", "stone_pickaxe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan for stone_pickaxe x1"))
        .stdout(predicate::str::contains("gather"))
        .stdout(predicate::str::contains("cobblestone"))
        .stdout(predicate::str::contains("oak_log"))
        .stdout(predicate::str::contains("craft"));
}

#[test]
fn test_plan_satisfied_requirement() {
    quarry_cmd()
        .args(["plan", "cobblestone", "3", "--have", "cobblestone=10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already satisfied"));
}

#[test]
fn test_plan_json_output() {
    let output = quarry_cmd()
        .args(["plan", "stone_pickaxe", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let task: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let subtasks = task["subtasks"].as_array().unwrap();
    assert!(!subtasks.is_empty());

    // The terminal craft is last and the plan is dependency-ordered.
    let last = subtasks.last().unwrap();
    assert_eq!(last["type"], "craft");
    assert_eq!(last["item"], "stone_pickaxe");
    assert_eq!(task["status"], "planned");
}

#[test]
fn test_plan_unknown_item_yields_empty_plan() {
    quarry_cmd()
        .args(["plan", "dragon_egg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No plan found for dragon_egg"));
}

// =============================================================================
// Run
// =============================================================================

#[test]
fn test_run_completes_stone_pickaxe() {
    quarry_cmd()
        .args(["run", "stone_pickaxe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPLETED"))
        .stdout(predicate::str::contains("Acquired stone_pickaxe x1"));
}

#[test]
fn test_run_with_denied_gather_fails_task() {
    quarry_cmd()
        .args(["run", "stone_pickaxe", "--deny-gather", "cobblestone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("Reason:"));
}

#[test]
fn test_run_json_reports_subtask_statuses() {
    let output = quarry_cmd()
        .args([
            "run",
            "stone_pickaxe",
            "--deny-gather",
            "cobblestone",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["status"], "failed");

    let subtasks = report["subtasks"].as_array().unwrap();
    let craft = subtasks
        .iter()
        .find(|s| s["target"] == "stone_pickaxe")
        .unwrap();
    assert_eq!(craft["status"], "pending");
}

#[test]
fn test_run_accepts_priority_bands() {
    quarry_cmd()
        .args(["run", "oak_log", "2", "--priority", "critical"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPLETED"));

    quarry_cmd()
        .args(["run", "oak_log", "2", "--priority", "77"])
        .assert()
        .success();

    quarry_cmd()
        .args(["run", "oak_log", "2", "--priority", "sometime"])
        .assert()
        .failure();
}

// =============================================================================
// Journal + history
// =============================================================================

#[test]
fn test_run_writes_journal_and_history_reads_it() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("journal.jsonl");
    let journal_arg = journal.to_str().unwrap();

    quarry_cmd()
        .args(["run", "oak_log", "2", "--journal", journal_arg])
        .assert()
        .success();

    quarry_cmd()
        .args(["run", "stone_pickaxe", "--deny-gather", "cobblestone", "--journal", journal_arg])
        .assert()
        .success();

    quarry_cmd()
        .args(["history", "--journal", journal_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("failed"))
        .stdout(predicate::str::contains("2 record(s)"));
}

#[test]
fn test_history_empty_journal() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("journal.jsonl");

    quarry_cmd()
        .args(["history", "--journal", journal.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No recorded tasks"));
}

#[test]
fn test_history_respects_limit() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("journal.jsonl");
    let journal_arg = journal.to_str().unwrap();

    for _ in 0..3 {
        quarry_cmd()
            .args(["run", "oak_log", "1", "--journal", journal_arg])
            .assert()
            .success();
    }

    quarry_cmd()
        .args(["history", "--journal", journal_arg, "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 record(s)"));
}

// =============================================================================
// Knowledge packs
// =============================================================================

#[test]
fn test_run_with_custom_knowledge_pack() {
    let dir = TempDir::new().unwrap();
    let pack = dir.path().join("pack.toml");
    std::fs::write(
        &pack,
        r#"
            fuels = ["peat"]
            container_item = "crate"

            [sources]
            peat = "bog"
            reed = "reed"

            [recipes.basket]
            output_count = 1
            [recipes.basket.ingredients]
            reed = 6
        "#,
    )
    .unwrap();

    quarry_cmd()
        .args(["run", "basket", "--knowledge", pack.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPLETED"));
}

#[test]
fn test_plan_rejects_bad_inventory_flag() {
    quarry_cmd()
        .args(["plan", "stone_pickaxe", "--have", "cobblestone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected item=count"));
}
