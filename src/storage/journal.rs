//! JSONL completion journal
//!
//! One JSON record per line, one line per terminal task. This is the memory
//! sink external collaborators read for persistence; the engine only appends.
//! Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskStatus};

/// One archived task outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Append-only store for task completion records
pub struct CompletionJournal {
    path: PathBuf,
}

impl CompletionJournal {
    /// Creates a journal at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a single record
    pub fn append(&self, record: &TaskRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on journal")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(writer, "{}", line).context("Failed to write record")?;
        writer.flush().context("Failed to flush journal")?;

        Ok(())
    }

    /// Reads every record in append order
    pub fn read_all(&self) -> Result<Vec<TaskRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open journal: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on journal")?;

        let reader = BufReader::new(&file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
            if line.trim().is_empty() {
                continue;
            }

            let record: TaskRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse record at line {}", line_num + 1))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Rewrites the journal keeping only the most recent `keep` records
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let records = self.read_all()?;
        if records.len() <= keep {
            return Ok(records.len());
        }
        let kept = &records[records.len() - keep..];

        let temp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on journal")?;

            let mut writer = BufWriter::new(&file);
            for record in kept {
                let line = serde_json::to_string(record).context("Failed to serialize record")?;
                writeln!(writer, "{}", line).context("Failed to write record")?;
            }
            writer.flush().context("Failed to flush journal")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(kept.len())
    }
}
