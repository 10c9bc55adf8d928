//! `quarry run` - plan a requirement and execute it in the simulated world

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::app::{load_knowledge, parse_inventory, parse_priority};
use super::output::Output;
use crate::capability::{Capabilities, SimWorld};
use crate::engine::{AgentContext, TaskExecutor};
use crate::storage::{CompletionJournal, EngineConfig};

#[allow(clippy::too_many_arguments)]
pub fn run(
    output: &Output,
    item: &str,
    quantity: u32,
    have: &[String],
    priority: &str,
    deny_gather: &[String],
    journal: Option<&Path>,
    config: Option<&Path>,
    knowledge: Option<&Path>,
) -> Result<()> {
    let kb = load_knowledge(knowledge)?;
    let inventory = parse_inventory(have)?;
    let priority = parse_priority(priority)?;

    let engine_config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(),
    };

    let mut world = SimWorld::with_knowledge(kb.clone());
    for (held_item, count) in &inventory {
        world.grant(held_item, *count);
    }
    for denied in deny_gather {
        world.deny_gather(denied);
        output.verbose(&format!("gather denied for {}", denied));
    }

    // The --journal flag wins over a journal_path in the config file.
    let journal_path = journal
        .map(Path::to_path_buf)
        .or_else(|| engine_config.journal_path.clone());

    let mut ctx = AgentContext::new(kb);
    if let Some(path) = journal_path {
        ctx = ctx.with_journal(CompletionJournal::new(path));
    }

    let mut executor = TaskExecutor::with_config(world, ctx, engine_config);
    let task_id = executor.submit(
        format!("Acquire {} {}", quantity, item),
        HashMap::from([(item.to_string(), quantity)]),
        priority,
    )?;

    let outcome = executor
        .run_next()
        .context("queue was empty after submit")?;
    let report = executor
        .task_status(&task_id)
        .context("executed task vanished")?;

    if output.is_json() {
        output.data(&report);
        return Ok(());
    }

    println!(
        "{} [{}] {}/{} subtasks",
        report.status.label().to_uppercase(),
        report.name,
        report.progress.completed,
        report.progress.total
    );
    if let Some(reason) = &report.failure_reason {
        println!("Reason: {}", reason);
    }

    if !report.subtasks.is_empty() {
        output.blank();
        println!("{:<4} {:<14} {:<20} {:>5}  {}", "#", "ACTION", "TARGET", "QTY", "STATUS");
        println!("{}", "-".repeat(62));
        for (index, subtask) in report.subtasks.iter().enumerate() {
            println!(
                "{:<4} {:<14} {:<20} {:>5}  {}",
                index + 1,
                subtask.action,
                subtask.target,
                subtask.quantity,
                subtask.status.label()
            );
        }
    }

    if outcome.completed {
        output.blank();
        output.success(&format!(
            "Acquired {} x{} ({} now held)",
            item,
            quantity,
            executor.capabilities().count_of(item)
        ));
    }

    Ok(())
}
