//! Main CLI application structure

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{execute, history, plan};
use crate::domain::priority;
use crate::knowledge::KnowledgeBase;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about = "Plan and simulate resource-goal execution")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decompose a requirement into its subtask plan
    Plan {
        /// Target item identifier
        item: String,

        /// Required quantity
        #[arg(default_value = "1")]
        quantity: u32,

        /// Starting inventory entries, as item=count (repeatable)
        #[arg(long = "have", value_name = "ITEM=COUNT")]
        have: Vec<String>,

        /// Knowledge pack TOML replacing the standard table
        #[arg(long)]
        knowledge: Option<PathBuf>,
    },

    /// Plan and execute a requirement against the simulated world
    Run {
        /// Target item identifier
        item: String,

        /// Required quantity
        #[arg(default_value = "1")]
        quantity: u32,

        /// Starting inventory entries, as item=count (repeatable)
        #[arg(long = "have", value_name = "ITEM=COUNT")]
        have: Vec<String>,

        /// Task priority: critical, high, normal, low, or an integer
        #[arg(long, default_value = "normal")]
        priority: String,

        /// Items whose gather attempts always fail (failure drills)
        #[arg(long = "deny-gather", value_name = "ITEM")]
        deny_gather: Vec<String>,

        /// Journal file receiving the completion record
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Engine configuration TOML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Knowledge pack TOML replacing the standard table
        #[arg(long)]
        knowledge: Option<PathBuf>,
    },

    /// Show recorded task outcomes
    History {
        /// Journal file to read (defaults to the per-user journal)
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Most recent records to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "quarry=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.format, cli.verbose);

    match cli.command {
        Commands::Plan {
            item,
            quantity,
            have,
            knowledge,
        } => plan::run(&output, &item, quantity, &have, knowledge.as_deref()),

        Commands::Run {
            item,
            quantity,
            have,
            priority,
            deny_gather,
            journal,
            config,
            knowledge,
        } => execute::run(
            &output,
            &item,
            quantity,
            &have,
            &priority,
            &deny_gather,
            journal.as_deref(),
            config.as_deref(),
            knowledge.as_deref(),
        ),

        Commands::History { journal, limit } => {
            history::run(&output, journal.as_deref(), limit)
        }
    }
}

/// Parses repeated `item=count` flags into an inventory map
pub(crate) fn parse_inventory(entries: &[String]) -> Result<HashMap<String, u32>> {
    let mut inventory = HashMap::new();
    for entry in entries {
        let Some((item, count)) = entry.split_once('=') else {
            bail!("invalid inventory entry '{}', expected item=count", entry);
        };
        let count: u32 = count
            .parse()
            .with_context(|| format!("invalid count in inventory entry '{}'", entry))?;
        *inventory.entry(item.to_string()).or_insert(0) += count;
    }
    Ok(inventory)
}

/// Parses a priority band name or raw integer
pub(crate) fn parse_priority(raw: &str) -> Result<i32> {
    match raw {
        "critical" => Ok(priority::CRITICAL),
        "high" => Ok(priority::HIGH),
        "normal" => Ok(priority::NORMAL),
        "low" => Ok(priority::LOW),
        other => other
            .parse()
            .with_context(|| format!("invalid priority '{}'", other)),
    }
}

/// Loads a knowledge pack, or the standard table when no path is given
pub(crate) fn load_knowledge(path: Option<&std::path::Path>) -> Result<KnowledgeBase> {
    match path {
        None => Ok(KnowledgeBase::standard()),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read knowledge pack: {}", path.display()))?;
            KnowledgeBase::from_toml_str(&raw)
                .with_context(|| format!("Failed to parse knowledge pack: {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_entries_parse_and_accumulate() {
        let inventory =
            parse_inventory(&["coal=3".to_string(), "coal=2".to_string(), "stick=1".to_string()])
                .unwrap();
        assert_eq!(inventory.get("coal"), Some(&5));
        assert_eq!(inventory.get("stick"), Some(&1));
    }

    #[test]
    fn bad_inventory_entries_are_rejected() {
        assert!(parse_inventory(&["coal".to_string()]).is_err());
        assert!(parse_inventory(&["coal=lots".to_string()]).is_err());
    }

    #[test]
    fn priority_bands_and_integers() {
        assert_eq!(parse_priority("critical").unwrap(), priority::CRITICAL);
        assert_eq!(parse_priority("low").unwrap(), priority::LOW);
        assert_eq!(parse_priority("37").unwrap(), 37);
        assert!(parse_priority("urgent-ish").is_err());
    }
}
