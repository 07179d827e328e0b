// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`SchedulerEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the channel
//! - arming/cancelling the real timers
//! - starting and killing processes through a `ProcessBackend`
//!
//! Task bodies run inside the core (they are plain closures), but the core
//! itself has no Tokio timers, no processes and no channels apart from the
//! optional submission reply. Tests drive it by feeding events directly,
//! which makes the test the clock.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::admission::AdmissionGate;
use crate::engine::event_handlers::{CoreCommand, CoreStep};
use crate::engine::queue::TaskQueue;
use crate::engine::timers::{DequeueState, TimerSlot};
use crate::engine::{ProcessId, RuntimeOptions, SchedulerEvent};
use crate::fs::FileSystem;
use crate::progress::ProgressReporter;
use crate::sink::{OutputTarget, ResultSink};
use crate::task::ExitAction;

/// The one external process that may be live.
pub(crate) struct LiveProcess {
    pub(crate) id: ProcessId,
    pub(crate) label: String,
    pub(crate) target: OutputTarget,
    pub(crate) on_exit: ExitAction,
}

/// Pure core runtime state.
///
/// This owns:
/// - the task queue
/// - the admission gate
/// - dequeue and progress timer state
/// - the live process record (output target + exit action)
/// - the result sink, file system handle and progress reporter
pub struct CoreRuntime {
    pub(super) queue: TaskQueue,
    pub(super) admission: AdmissionGate,
    pub(super) dequeue: DequeueState,
    pub(super) dequeue_generation: u64,
    pub(super) progress: TimerSlot,
    pub(super) live: Option<LiveProcess>,
    pub(super) next_process_id: u64,
    pub(super) sink: Box<dyn ResultSink>,
    pub(super) fs: Arc<dyn FileSystem>,
    pub(super) reporter: Box<dyn ProgressReporter>,
    pub(super) options: RuntimeOptions,
}

impl fmt::Debug for CoreRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRuntime")
            .field("queue", &self.queue.labels())
            .field("admission", &self.admission)
            .field("dequeue", &self.dequeue)
            .field("progress", &self.progress)
            .field("live_process", &self.live.as_ref().map(|l| l.id))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CoreRuntime {
    pub fn new(
        options: RuntimeOptions,
        sink: Box<dyn ResultSink>,
        fs: Arc<dyn FileSystem>,
        reporter: Box<dyn ProgressReporter>,
    ) -> Self {
        Self {
            queue: TaskQueue::new(),
            admission: AdmissionGate::new(options.max_in_flight),
            dequeue: DequeueState::Idle,
            dequeue_generation: 0,
            progress: TimerSlot::default(),
            live: None,
            next_process_id: 1,
            sink,
            fs,
            reporter,
            options,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Nothing queued, nothing running, no timers live.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && self.dequeue.is_idle()
            && self.live.is_none()
            && !self.progress.is_armed()
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn in_flight(&self) -> usize {
        self.admission.in_flight()
    }

    pub fn dequeue_state(&self) -> DequeueState {
        self.dequeue
    }

    pub fn progress_running(&self) -> bool {
        self.progress.is_armed()
    }

    pub fn live_process(&self) -> Option<ProcessId> {
        self.live.as_ref().map(|l| l.id)
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: SchedulerEvent) -> CoreStep {
        match event {
            SchedulerEvent::Submit {
                chain,
                admission,
                reply,
            } => {
                let (result, step) = self.handle_submit(chain, admission);
                if let Some(reply) = reply {
                    // The submitter may have stopped waiting; nothing to do then.
                    let _ = reply.send(result);
                }
                step
            }
            SchedulerEvent::DequeueTick { generation } => self.handle_dequeue_tick(generation),
            SchedulerEvent::ProgressTick { generation } => self.handle_progress_tick(generation),
            SchedulerEvent::ProcessOutput { id, chunk } => self.handle_process_output(id, &chunk),
            SchedulerEvent::ProcessExited { id, outcome } => {
                self.handle_process_exit(id, outcome)
            }
            SchedulerEvent::StopAll => {
                let mut commands = Vec::new();
                self.stop_all(&mut commands);
                self.finish(commands)
            }
            SchedulerEvent::SetReporter(reporter) => {
                debug!("progress reporter replaced");
                self.reporter = reporter;
                CoreStep::default()
            }
            SchedulerEvent::FinishWhenIdle => {
                debug!("exit requested once idle");
                self.options.exit_when_idle = true;
                self.finish(Vec::new())
            }
            SchedulerEvent::ShutdownRequested => {
                info!("shutdown requested");
                let mut commands = Vec::new();
                self.stop_all(&mut commands);
                commands.push(CoreCommand::RequestExit);
                CoreStep {
                    commands,
                    keep_running: false,
                }
            }
        }
    }

    /// Arm the dequeuer if it is idle, and make sure progress is reported.
    pub(super) fn start_if_idle(&mut self, commands: &mut Vec<CoreCommand>) {
        if self.dequeue.is_idle() {
            self.arm_dequeue(commands);
        }
        self.start_progress(commands);
    }

    /// Schedule a dequeue tick, replacing any scheduled one.
    pub(super) fn arm_dequeue(&mut self, commands: &mut Vec<CoreCommand>) {
        self.dequeue_generation += 1;
        let generation = self.dequeue_generation;
        self.dequeue = DequeueState::Armed { generation };
        commands.push(CoreCommand::ArmDequeue {
            generation,
            delay: self.options.tick_delay,
        });
    }

    /// Back to idle: cancel the dequeue timer, kill any live process, stop
    /// the progress indicator.
    pub(super) fn disarm(&mut self, commands: &mut Vec<CoreCommand>) {
        if !self.dequeue.is_idle() {
            debug!(state = ?self.dequeue, "dequeuer disarmed");
        }
        self.dequeue = DequeueState::Idle;
        commands.push(CoreCommand::CancelDequeue);
        self.kill_live(commands);
        self.stop_progress(commands);
    }

    pub(super) fn start_progress(&mut self, commands: &mut Vec<CoreCommand>) {
        if self.progress.is_armed() {
            return;
        }
        let generation = self.progress.arm();
        commands.push(CoreCommand::StartProgress {
            generation,
            period: self.options.progress_tick,
        });
    }

    /// Stop the progress indicator. Emits `done` only if it was running.
    pub(super) fn stop_progress(&mut self, commands: &mut Vec<CoreCommand>) {
        if self.progress.cancel() {
            commands.push(CoreCommand::StopProgress);
            self.reporter.done();
        }
    }

    /// Forget the live process (its exit action will never run) and ask the
    /// shell to kill it.
    pub(super) fn kill_live(&mut self, commands: &mut Vec<CoreCommand>) {
        if let Some(live) = self.live.take() {
            info!(process_id = %live.id, task = %live.label, "killing live process");
            commands.push(CoreCommand::KillProcess { id: live.id });
        }
    }

    /// Unconditional hard reset, independent of epilogue bookkeeping.
    pub(super) fn stop_all(&mut self, commands: &mut Vec<CoreCommand>) {
        let dropped = self.queue.len();
        self.stop_progress(commands);
        self.dequeue = DequeueState::Idle;
        commands.push(CoreCommand::CancelDequeue);
        self.kill_live(commands);
        self.queue.clear();
        self.admission.reset();
        info!(dropped, "stopped all pending work");
    }

    /// Wrap up a step, requesting exit in batch mode once everything is idle.
    pub(super) fn finish(&mut self, mut commands: Vec<CoreCommand>) -> CoreStep {
        let mut keep_running = true;
        if self.options.exit_when_idle && self.is_idle() {
            info!("queue drained; exiting");
            commands.push(CoreCommand::RequestExit);
            keep_running = false;
        }
        CoreStep {
            commands,
            keep_running,
        }
    }
}
