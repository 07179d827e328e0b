// src/engine/mod.rs

//! Scheduling engine for taskseq.
//!
//! This module ties together:
//! - the task queue with its always-last epilogue ([`queue`])
//! - the admission gate bounding top-level submissions ([`admission`])
//! - the dequeue/progress timer state machines ([`timers`])
//! - the pure core that reacts to events ([`core`], [`event_handlers`])
//! - the async IO shell that owns timers and the process backend
//!   ([`runtime`])
//! - the public facade collaborators submit chains through ([`facade`])
//!
//! Everything runs on a single logical thread: the runtime loop receives
//! timer ticks, process output/exit notifications and submissions from one
//! channel and feeds them to the core one at a time.

use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::errors::Result;
use crate::progress::ProgressReporter;
use crate::task::Chain;

/// Identity of one spawned external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an external process ended. Only logged and handed to exit actions;
/// the queue treats every exit the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Failed(i32),
}

/// Whether a submission goes through the admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new top-level request; counted against `max_in_flight`.
    TopLevel,
    /// Work appended on behalf of something already admitted.
    FollowUp,
}

/// Tunables shared by the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Maximum number of top-level requests in flight.
    pub max_in_flight: usize,
    /// Delay before the next task is popped after a synchronous one.
    pub tick_delay: Duration,
    /// Period of the progress indicator.
    pub progress_tick: Duration,
    /// If true, stop the runtime loop once the queue drains (batch mode).
    ///
    /// Setting this before the first submission lets the loop exit between
    /// two submissions; batch callers should submit everything first and
    /// then send [`SchedulerEvent::FinishWhenIdle`].
    pub exit_when_idle: bool,
}

pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;
pub const DEFAULT_TICK_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_PROGRESS_TICK: Duration = Duration::from_millis(100);

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            tick_delay: DEFAULT_TICK_DELAY,
            progress_tick: DEFAULT_PROGRESS_TICK,
            exit_when_idle: false,
        }
    }
}

/// Events flowing into the runtime loop.
pub enum SchedulerEvent {
    /// Append a chain of tasks to the queue.
    Submit {
        chain: Chain,
        admission: Admission,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    /// The one-shot dequeue timer fired.
    DequeueTick { generation: u64 },
    /// The periodic progress timer fired.
    ProgressTick { generation: u64 },
    /// A chunk of stdout/stderr from a process.
    ProcessOutput { id: ProcessId, chunk: String },
    /// A process terminated on its own.
    ProcessExited { id: ProcessId, outcome: ProcessOutcome },
    /// Hard reset: drop the queue, kill the live process, stop timers.
    StopAll,
    /// Replace the progress reporter.
    SetReporter(Box<dyn ProgressReporter>),
    /// Hard reset, then stop the runtime loop.
    ShutdownRequested,
    /// Stop the runtime loop as soon as everything is idle (now, if it
    /// already is). Work submitted before this event is never cut short.
    FinishWhenIdle,
}

impl fmt::Debug for SchedulerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerEvent::Submit {
                chain, admission, ..
            } => f
                .debug_struct("Submit")
                .field("tasks", &chain.len())
                .field("admission", admission)
                .finish_non_exhaustive(),
            SchedulerEvent::DequeueTick { generation } => f
                .debug_struct("DequeueTick")
                .field("generation", generation)
                .finish(),
            SchedulerEvent::ProgressTick { generation } => f
                .debug_struct("ProgressTick")
                .field("generation", generation)
                .finish(),
            SchedulerEvent::ProcessOutput { id, chunk } => f
                .debug_struct("ProcessOutput")
                .field("id", id)
                .field("bytes", &chunk.len())
                .finish(),
            SchedulerEvent::ProcessExited { id, outcome } => f
                .debug_struct("ProcessExited")
                .field("id", id)
                .field("outcome", outcome)
                .finish(),
            SchedulerEvent::StopAll => f.write_str("StopAll"),
            SchedulerEvent::SetReporter(_) => f.write_str("SetReporter(..)"),
            SchedulerEvent::ShutdownRequested => f.write_str("ShutdownRequested"),
            SchedulerEvent::FinishWhenIdle => f.write_str("FinishWhenIdle"),
        }
    }
}

pub mod admission;
pub mod core;
pub mod event_handlers;
pub mod facade;
pub mod queue;
pub mod runtime;
pub mod timers;

pub use admission::AdmissionGate;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use facade::{Sequencer, SequencerHandle};
pub use queue::TaskQueue;
pub use runtime::Runtime;
pub use timers::{DequeueState, TimerSlot};
