//! `quarry plan` - print the decomposition for a requirement

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

use super::app::{load_knowledge, parse_inventory};
use super::output::Output;
use crate::domain::{priority, Subtask};
use crate::engine::RequirementAnalyzer;

pub fn run(
    output: &Output,
    item: &str,
    quantity: u32,
    have: &[String],
    knowledge: Option<&Path>,
) -> Result<()> {
    let kb = load_knowledge(knowledge)?;
    let inventory = parse_inventory(have)?;

    output.verbose(&format!("planning {} x{}", item, quantity));

    let analyzer = RequirementAnalyzer::new(&kb);
    let task = analyzer.build_task(
        format!("Acquire {} {}", quantity, item),
        HashMap::from([(item.to_string(), quantity)]),
        priority::NORMAL,
        &inventory,
    )?;

    if output.is_json() {
        output.data(&task);
        return Ok(());
    }

    if task.subtasks.is_empty() {
        if inventory.get(item).copied().unwrap_or(0) >= quantity {
            println!("Requirement already satisfied: {} x{} on hand", item, quantity);
        } else {
            println!("No plan found for {}: item unknown to the knowledge base", item);
        }
        return Ok(());
    }

    println!("Plan for {} x{} ({} subtasks):", item, quantity, task.subtasks.len());
    println!("{:<4} {:<14} {:<20} {:>5}  {}", "#", "ACTION", "TARGET", "QTY", "DEPENDS ON");
    println!("{}", "-".repeat(70));
    for (index, subtask) in task.subtasks.iter().enumerate() {
        println!(
            "{:<4} {:<14} {:<20} {:>5}  {}",
            index + 1,
            subtask.action.label(),
            subtask.action.target(),
            subtask.action.quantity(),
            describe_dependencies(subtask, &task.subtasks)
        );
    }

    Ok(())
}

/// Renders dependencies as the plan positions they point at
fn describe_dependencies(subtask: &Subtask, all: &[Subtask]) -> String {
    let mut positions = Vec::new();
    for key in &subtask.dependencies {
        for (index, other) in all.iter().enumerate() {
            if other.id != subtask.id && key.matches(other) {
                positions.push((index + 1).to_string());
            }
        }
    }
    if positions.is_empty() {
        "-".to_string()
    } else {
        positions.join(", ")
    }
}
