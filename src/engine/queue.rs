//! Priority task queue
//!
//! Holds every pending top-level task, ordered by descending priority and,
//! within a priority, by ascending creation time (FIFO). The ordering
//! invariant is restored on every insertion, so a CRITICAL task enqueued at
//! any queue depth dequeues next.

use crate::domain::{Task, TaskId};

#[derive(Debug, Default)]
pub struct PriorityTaskQueue {
    tasks: Vec<Task>,
}

impl PriorityTaskQueue {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Inserts a task at its sorted position
    pub fn enqueue(&mut self, task: Task) {
        let position = self.tasks.partition_point(|existing| {
            existing.priority > task.priority
                || (existing.priority == task.priority && existing.created_at <= task.created_at)
        });
        self.tasks.insert(position, task);
        debug_assert!(self.is_sorted());
    }

    /// Removes and returns the highest-priority task
    pub fn dequeue_highest(&mut self) -> Option<Task> {
        if self.tasks.is_empty() {
            None
        } else {
            Some(self.tasks.remove(0))
        }
    }

    /// The task that would dequeue next
    pub fn peek(&self) -> Option<&Task> {
        self.tasks.first()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Looks up a queued task by ID
    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == task_id)
    }

    /// Removes a queued task by ID (caller-side cancellation before start)
    pub fn remove(&mut self, task_id: &TaskId) -> Option<Task> {
        let position = self.tasks.iter().position(|t| &t.id == task_id)?;
        Some(self.tasks.remove(position))
    }

    /// Invariant check: descending priority, FIFO within a priority
    pub fn is_sorted(&self) -> bool {
        self.tasks.windows(2).all(|pair| {
            pair[0].priority > pair[1].priority
                || (pair[0].priority == pair[1].priority
                    && pair[0].created_at <= pair[1].created_at)
        })
    }
}
