//! `quarry history` - show recorded task outcomes

use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::storage::{default_journal_path, CompletionJournal};

pub fn run(output: &Output, journal: Option<&Path>, limit: usize) -> Result<()> {
    let path = journal
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_journal_path);
    output.verbose(&format!("reading journal: {}", path.display()));

    let records = CompletionJournal::new(&path).read_all()?;
    let start = records.len().saturating_sub(limit);
    let recent = &records[start..];

    if output.is_json() {
        output.data(&recent);
        return Ok(());
    }

    if recent.is_empty() {
        println!("No recorded tasks in {}", path.display());
        return Ok(());
    }

    println!("{:<25} {:<11} {:>9}  {}", "RECORDED", "STATUS", "TOOK", "TASK");
    println!("{}", "-".repeat(70));
    for record in recent {
        println!(
            "{:<25} {:<11} {:>7}ms  {}",
            record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            record.status.label(),
            record.duration_ms,
            record.name
        );
    }
    println!();
    println!("{} record(s)", recent.len());

    Ok(())
}
