// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::task::{Chain, Task};

/// FIFO of pending tasks, terminated by the epilogue.
///
/// Semantics:
/// - Whenever the queue is non-empty its last entry is the epilogue, and the
///   epilogue appears nowhere else.
/// - Appending removes the epilogue, pushes the new task, then pushes the
///   epilogue again, so the epilogue only runs once everything submitted
///   before it has run.
/// - Length is unbounded; only top-level submissions are capped (see
///   [`super::AdmissionGate`]).
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a single task before the epilogue.
    ///
    /// Invalid tasks are dropped with a warning and leave the queue untouched.
    /// Returns whether the task was appended.
    pub fn append(&mut self, task: Task) -> bool {
        if !task.is_valid() {
            warn!(task = %task.label(), "refusing to enqueue invalid task");
            return false;
        }

        if self.tasks.back().is_some_and(Task::is_epilogue) {
            self.tasks.pop_back();
        }
        debug!(task = %task.label(), "enqueued task");
        self.tasks.push_back(task);
        self.tasks.push_back(Task::epilogue());
        true
    }

    /// Append every task of `chain` in order. Returns how many were appended.
    pub fn chain(&mut self, chain: Chain) -> usize {
        chain
            .into_tasks()
            .into_iter()
            .map(|task| self.append(task))
            .filter(|appended| *appended)
            .count()
    }

    pub fn pop_front(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Drop every pending task without running it.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Labels of the pending tasks, front first.
    pub fn labels(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.label().to_string()).collect()
    }

    /// Positions of epilogue entries, front first.
    pub fn epilogue_positions(&self) -> Vec<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_epilogue())
            .map(|(i, _)| i)
            .collect()
    }
}
