//! Agent context
//!
//! The explicit, caller-owned state shared across engine components: world
//! knowledge, task history, and remembered storage locations. Replaces any
//! ambient global memory; everything the engine knows flows through here.

use tracing::warn;

use crate::capability::Position;
use crate::knowledge::KnowledgeBase;
use crate::storage::{CompletionJournal, TaskRecord};

pub struct AgentContext {
    pub knowledge: KnowledgeBase,
    history: Vec<TaskRecord>,
    storage_locations: Vec<Position>,
    journal: Option<CompletionJournal>,
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new(KnowledgeBase::standard())
    }
}

impl AgentContext {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Self {
            knowledge,
            history: Vec::new(),
            storage_locations: Vec::new(),
            journal: None,
        }
    }

    /// Attaches a completion journal; every recorded outcome is appended
    pub fn with_journal(mut self, journal: CompletionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Records a terminal task outcome in history and the journal.
    ///
    /// Journal write failures are logged, not propagated; the in-memory
    /// history stays authoritative for this process.
    pub fn record(&mut self, record: TaskRecord) {
        if let Some(journal) = &self.journal {
            if let Err(error) = journal.append(&record) {
                warn!(%error, task = %record.task_id, "failed to journal task outcome");
            }
        }
        self.history.push(record);
    }

    pub fn history(&self) -> &[TaskRecord] {
        &self.history
    }

    /// Remembers a container location for future overflow handling
    pub fn remember_container(&mut self, position: Position) {
        if !self.storage_locations.contains(&position) {
            self.storage_locations.push(position);
        }
    }

    pub fn known_containers(&self) -> &[Position] {
        &self.storage_locations
    }

    pub fn forget_container(&mut self, position: &Position) {
        self.storage_locations.retain(|p| p != position);
    }
}
