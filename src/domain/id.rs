//! Identifier scheme for tasks and subtasks
//!
//! ID Format:
//! - Task IDs: `t-{7-char-hash}` (e.g., `t-9d3e5f2`)
//! - Subtask IDs: `{task-id}.{sequence}` (e.g., `t-9d3e5f2.3`)
//!
//! Hash is derived from task name + creation timestamp, ensuring uniqueness.
//! Same name at different times produces different IDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID format: expected 't-{{7-char-hash}}', got '{0}'")]
    InvalidTaskId(String),

    #[error("Invalid subtask ID format: expected '{{task-id}}.{{sequence}}', got '{0}'")]
    InvalidSubtaskId(String),

    #[error("Invalid sequence number: {0}")]
    InvalidSequence(String),
}

/// Generates a 7-character hash from a name and timestamp
fn generate_hash(name: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", name, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 7 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// Task ID in the format `t-{7-char-hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId {
    hash: String,
}

impl TaskId {
    /// Creates a new task ID from the task name and creation timestamp
    pub fn new(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            hash: generate_hash(name, timestamp),
        }
    }

    /// Returns the hash portion of the ID
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Creates a subtask ID under this task with the given sequence number
    pub fn subtask(&self, sequence: u32) -> SubtaskId {
        SubtaskId {
            hash: self.hash.clone(),
            sequence,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t-{}", self.hash)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hash = s
            .strip_prefix("t-")
            .ok_or_else(|| IdError::InvalidTaskId(s.to_string()))?;

        if !is_valid_hash(hash) {
            return Err(IdError::InvalidTaskId(s.to_string()));
        }

        Ok(Self {
            hash: hash.to_string(),
        })
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}

/// Subtask ID in the format `{task-id}.{sequence}` (e.g., `t-9d3e5f2.3`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubtaskId {
    hash: String,
    sequence: u32,
}

impl SubtaskId {
    /// Returns the ID of the task this subtask belongs to
    pub fn task_id(&self) -> TaskId {
        TaskId {
            hash: self.hash.clone(),
        }
    }

    /// Returns the sequence number within the owning task
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t-{}.{}", self.hash, self.sequence)
    }
}

impl FromStr for SubtaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let rest = s
            .strip_prefix("t-")
            .ok_or_else(|| IdError::InvalidSubtaskId(s.to_string()))?;

        let (hash, seq) = rest
            .split_once('.')
            .ok_or_else(|| IdError::InvalidSubtaskId(s.to_string()))?;

        if !is_valid_hash(hash) {
            return Err(IdError::InvalidSubtaskId(s.to_string()));
        }

        let sequence = seq
            .parse::<u32>()
            .map_err(|_| IdError::InvalidSequence(seq.to_string()))?;

        Ok(Self {
            hash: hash.to_string(),
            sequence,
        })
    }
}

impl TryFrom<String> for SubtaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubtaskId> for String {
    fn from(id: SubtaskId) -> Self {
        id.to_string()
    }
}
