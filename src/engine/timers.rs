// src/engine/timers.rs

//! Timer bookkeeping for the core.
//!
//! The core never owns a real timer. It hands out generation numbers and the
//! shell tags every tick with the generation it was armed with; a tick whose
//! generation no longer matches is stale and ignored. This gives "at most one
//! live timer" and idempotent cancellation even when a tick is already queued
//! behind the cancel.

use crate::engine::ProcessId;

/// Generation-tagged on/off timer slot.
#[derive(Debug, Default)]
pub struct TimerSlot {
    generation: u64,
    armed: bool,
}

impl TimerSlot {
    /// Arm (or re-arm) the slot and return the new generation.
    pub fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.armed = true;
        self.generation
    }

    /// Disarm the slot. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether a tick carrying `generation` belongs to the live timer.
    pub fn accepts(&self, generation: u64) -> bool {
        self.armed && self.generation == generation
    }
}

/// State of the dequeuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeueState {
    /// No timer armed and nothing in progress.
    Idle,
    /// A dequeue tick with this generation is scheduled.
    Armed { generation: u64 },
    /// An asynchronous task is running; its exit re-arms the dequeuer.
    AwaitingExit { process: ProcessId },
}

impl DequeueState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DequeueState::Idle)
    }
}
