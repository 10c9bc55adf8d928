//! Task and subtask domain model
//!
//! A task is one top-level unit of work ("have 1 stone_pickaxe"). It owns an
//! ordered sequence of typed subtasks produced by requirement analysis, and
//! moves through a fixed status machine driven by the executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::{SubtaskId, TaskId};

/// Reserved priority bands. Higher values run first.
pub mod priority {
    /// Survival-critical work; always dequeues next.
    pub const CRITICAL: i32 = 100;
    pub const HIGH: i32 = 50;
    pub const NORMAL: i32 = 25;
    pub const LOW: i32 = 10;

    /// Returns the band name for a known priority value
    pub fn label(value: i32) -> Option<&'static str> {
        match value {
            CRITICAL => Some("critical"),
            HIGH => Some("high"),
            NORMAL => Some("normal"),
            LOW => Some("low"),
            _ => None,
        }
    }
}

/// Status of a top-level task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Failed,
    Suspended,
}

impl TaskStatus {
    /// Returns true if this status is terminal (archived, never re-enqueued)
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Returns true if the task is currently being executed
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    /// Returns true if the task can be resumed back to in-progress
    pub fn is_resumable(&self) -> bool {
        matches!(self, TaskStatus::Suspended)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Planned => "planned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Suspended => "suspended",
        }
    }
}

/// Status of a single subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl SubtaskStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, SubtaskStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubtaskStatus::Completed | SubtaskStatus::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubtaskStatus::Pending => "pending",
            SubtaskStatus::InProgress => "in_progress",
            SubtaskStatus::Completed => "completed",
            SubtaskStatus::Failed => "failed",
        }
    }
}

/// One primitive, typed unit of work inside a task's graph
///
/// Each variant carries only the fields its capability call needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubtaskAction {
    /// Physically collect `quantity` of `item`
    Gather { item: String, quantity: u32 },
    /// Craft `quantity` of `item` from owned materials
    Craft { item: String, quantity: u32 },
    /// Smelt `input` into `quantity` of `output`
    Smelt {
        input: String,
        output: String,
        quantity: u32,
    },
    /// Acquire a specific tool (opaque to the engine: mine, craft or trade)
    ToolUpgrade { tool: String },
    /// Collect furnace fuel ahead of a smelt
    GatherFuel { item: String, quantity: u32 },
}

impl SubtaskAction {
    /// Scheduling rank among otherwise-unordered siblings; higher runs earlier
    pub fn rank(&self) -> u8 {
        match self {
            SubtaskAction::ToolUpgrade { .. } => 10,
            SubtaskAction::GatherFuel { .. } => 8,
            SubtaskAction::Smelt { .. } => 6,
            SubtaskAction::Craft { .. } => 5,
            SubtaskAction::Gather { .. } => 3,
        }
    }

    /// The item this action produces or acquires; used for dependency
    /// matching by item name
    pub fn target(&self) -> &str {
        match self {
            SubtaskAction::Gather { item, .. } => item,
            SubtaskAction::Craft { item, .. } => item,
            SubtaskAction::Smelt { output, .. } => output,
            SubtaskAction::ToolUpgrade { tool } => tool,
            SubtaskAction::GatherFuel { item, .. } => item,
        }
    }

    /// Quantity the action aims for (1 for tool upgrades)
    pub fn quantity(&self) -> u32 {
        match self {
            SubtaskAction::Gather { quantity, .. } => *quantity,
            SubtaskAction::Craft { quantity, .. } => *quantity,
            SubtaskAction::Smelt { quantity, .. } => *quantity,
            SubtaskAction::ToolUpgrade { .. } => 1,
            SubtaskAction::GatherFuel { quantity, .. } => *quantity,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubtaskAction::Gather { .. } => "gather",
            SubtaskAction::Craft { .. } => "craft",
            SubtaskAction::Smelt { .. } => "smelt",
            SubtaskAction::ToolUpgrade { .. } => "tool_upgrade",
            SubtaskAction::GatherFuel { .. } => "gather_fuel",
        }
    }

    /// Advisory duration hint in seconds; never enforced
    pub fn estimated_secs(&self) -> u32 {
        match self {
            SubtaskAction::Gather { quantity, .. } => 5 * (*quantity).max(1),
            SubtaskAction::Craft { quantity, .. } => 2 * (*quantity).max(1),
            SubtaskAction::Smelt { quantity, .. } => 10 * (*quantity).max(1),
            SubtaskAction::ToolUpgrade { .. } => 60,
            SubtaskAction::GatherFuel { quantity, .. } => 5 * (*quantity).max(1),
        }
    }
}

/// A dependency reference inside one task: another subtask by ID, or the
/// item name a sibling subtask produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyKey {
    Id(SubtaskId),
    Item(String),
}

impl DependencyKey {
    /// Returns true if `subtask` is the one this key refers to
    pub fn matches(&self, subtask: &Subtask) -> bool {
        match self {
            DependencyKey::Id(id) => &subtask.id == id,
            DependencyKey::Item(name) => subtask.action.target() == name,
        }
    }
}

/// One primitive unit inside a task's graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,

    #[serde(flatten)]
    pub action: SubtaskAction,

    pub status: SubtaskStatus,

    /// Subtasks (by ID or produced-item name) that must complete first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyKey>,

    /// Advisory duration hint in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_secs: Option<u32>,
}

impl Subtask {
    pub fn new(id: SubtaskId, action: SubtaskAction) -> Self {
        let estimated_secs = Some(action.estimated_secs());
        Self {
            id,
            action,
            status: SubtaskStatus::Pending,
            dependencies: Vec::new(),
            estimated_secs,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyKey>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// A subtask is ready iff every dependency that resolves to a sibling is
    /// COMPLETED. A key matching no sibling is trivially satisfied (the
    /// requirement was covered by inventory at decomposition time).
    pub fn is_ready(&self, siblings: &[Subtask]) -> bool {
        self.dependencies.iter().all(|key| {
            siblings
                .iter()
                .filter(|other| other.id != self.id && key.matches(other))
                .all(|other| other.status.is_complete())
        })
    }
}

/// Progress counters for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            100
        } else {
            self.completed * 100 / self.total
        }
    }
}

/// An opaque single action for direct tasks that skip decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectAction {
    pub label: String,
}

/// A top-level unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Item identifier -> required quantity; insertion order irrelevant
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub requirements: HashMap<String, u32>,

    pub priority: i32,

    pub status: TaskStatus,

    /// Owned exclusively by this task; populated once by decomposition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,

    pub progress: Progress,

    pub created_at: DateTime<Utc>,

    /// Set when a direct task bypasses decomposition entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct: Option<DirectAction>,

    /// Human-readable reason recorded when the task fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Task {
    /// Creates a new decomposable task from an item/quantity requirement map
    pub fn new(name: impl Into<String>, requirements: HashMap<String, u32>, priority: i32) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: TaskId::new(&name, now),
            name,
            description: None,
            requirements,
            priority,
            status: TaskStatus::Planned,
            subtasks: Vec::new(),
            progress: Progress::default(),
            created_at: now,
            direct: None,
            failure_reason: None,
        }
    }

    /// Creates a direct task wrapping a single opaque action
    pub fn direct(name: impl Into<String>, label: impl Into<String>, priority: i32) -> Self {
        let mut task = Self::new(name, HashMap::new(), priority);
        task.direct = Some(DirectAction {
            label: label.into(),
        });
        task
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if this task skips decomposition
    pub fn is_direct(&self) -> bool {
        self.direct.is_some()
    }

    /// Appends a new subtask and returns its ID
    pub fn push_subtask(
        &mut self,
        action: SubtaskAction,
        dependencies: Vec<DependencyKey>,
    ) -> SubtaskId {
        let id = self.id.subtask(self.subtasks.len() as u32 + 1);
        self.subtasks
            .push(Subtask::new(id.clone(), action).with_dependencies(dependencies));
        id
    }

    /// Finds a pending GATHER subtask for `item`, for quantity merging
    pub fn pending_gather_mut(&mut self, item: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| {
            s.status == SubtaskStatus::Pending
                && matches!(&s.action, SubtaskAction::Gather { item: i, .. } if i == item)
        })
    }

    /// Finds a pending CRAFT subtask for `item`, for quantity merging
    pub fn pending_craft_mut(&mut self, item: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| {
            s.status == SubtaskStatus::Pending
                && matches!(&s.action, SubtaskAction::Craft { item: i, .. } if i == item)
        })
    }

    /// Finds a pending SMELT subtask producing `output`, for quantity merging
    pub fn pending_smelt_mut(&mut self, output: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| {
            s.status == SubtaskStatus::Pending
                && matches!(&s.action, SubtaskAction::Smelt { output: o, .. } if o == output)
        })
    }

    /// Finds a pending TOOL_UPGRADE subtask for `tool`, for upgrade merging
    pub fn pending_tool_upgrade_mut(&mut self, tool: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| {
            s.status == SubtaskStatus::Pending
                && matches!(&s.action, SubtaskAction::ToolUpgrade { tool: t } if t == tool)
        })
    }

    /// Finds a pending GATHER_FUEL subtask for `item`, for fuel merging
    pub fn pending_fuel_gather_mut(&mut self, item: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| {
            s.status == SubtaskStatus::Pending
                && matches!(&s.action, SubtaskAction::GatherFuel { item: i, .. } if i == item)
        })
    }

    /// Recomputes progress counters from subtask statuses
    pub fn refresh_progress(&mut self) {
        self.progress = Progress {
            completed: self
                .subtasks
                .iter()
                .filter(|s| s.status.is_complete())
                .count() as u32,
            total: self.subtasks.len() as u32,
        };
    }

    /// Index of the first subtask that has not completed, if any
    pub fn first_incomplete_index(&self) -> Option<usize> {
        self.subtasks
            .iter()
            .position(|s| !s.status.is_complete())
    }

    /// Transitions to in-progress (dequeue)
    pub fn start(&mut self) {
        if self.status == TaskStatus::Planned {
            self.status = TaskStatus::InProgress;
        }
    }

    /// Transitions to completed; only valid when every subtask completed
    pub fn complete(&mut self) {
        if self.status == TaskStatus::InProgress {
            self.status = TaskStatus::Completed;
        }
    }

    /// Transitions to failed with a reason
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.status == TaskStatus::InProgress {
            self.status = TaskStatus::Failed;
            self.failure_reason = Some(reason.into());
        }
    }

    /// Freezes the task at a subtask boundary; subtask statuses keep their
    /// exact values
    pub fn suspend(&mut self) {
        if self.status == TaskStatus::InProgress {
            self.status = TaskStatus::Suspended;
        }
    }

    /// Moves a suspended task back to in-progress
    pub fn resume(&mut self) {
        if self.status == TaskStatus::Suspended {
            self.status = TaskStatus::InProgress;
        }
    }
}
