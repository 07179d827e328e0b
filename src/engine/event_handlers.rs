// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::core::{CoreRuntime, LiveProcess};
use crate::engine::timers::DequeueState;
use crate::engine::{Admission, ProcessId, ProcessOutcome};
use crate::errors::Result;
use crate::sink::OutputTarget;
use crate::task::{run_trapped, Chain, ExitContext, ProcessSpec, Task, TaskKind};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Schedule a one-shot `DequeueTick` after `delay`, replacing any
    /// scheduled one.
    ArmDequeue { generation: u64, delay: Duration },
    /// Cancel the scheduled dequeue tick, if any.
    CancelDequeue,
    /// Start periodic `ProgressTick`s.
    StartProgress { generation: u64, period: Duration },
    /// Stop the periodic progress ticks.
    StopProgress,
    /// Start a process, killing whatever process is still running.
    SpawnProcess { id: ProcessId, command: String },
    /// Kill the process if it is still running. No exit is reported for it.
    KillProcess { id: ProcessId },
    /// Request that the runtime loop exits.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl Default for CoreStep {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

impl CoreRuntime {
    /// Append a chain, going through the admission gate for top-level
    /// requests, and make sure the dequeuer is running.
    ///
    /// A rejected submission leaves every piece of state untouched. A chain
    /// with no valid task is not counted against the gate.
    pub(super) fn handle_submit(&mut self, chain: Chain, admission: Admission) -> (Result<()>, CoreStep) {
        let submitted = chain.len();
        let valid: Chain = chain
            .into_tasks()
            .into_iter()
            .filter(|task| {
                let ok = task.is_valid();
                if !ok {
                    warn!(task = %task.label(), "skipping invalid task in submitted chain");
                }
                ok
            })
            .collect();

        if valid.is_empty() {
            warn!(submitted, "submitted chain has no runnable tasks; ignoring");
            return (Ok(()), self.finish(Vec::new()));
        }

        if admission == Admission::TopLevel {
            if let Err(err) = self.admission.try_admit() {
                return (Err(err), CoreStep::default());
            }
        }

        let appended = self.queue.chain(valid);
        info!(
            appended,
            queued = self.queue.len(),
            in_flight = self.admission.in_flight(),
            ?admission,
            "chain submitted"
        );

        let mut commands = Vec::new();
        self.start_if_idle(&mut commands);
        (Ok(()), self.finish(commands))
    }

    /// Pop and run the next task.
    ///
    /// - synchronous task, queue still non-empty: re-arm right away
    /// - asynchronous task: wait for the process exit to re-arm
    /// - queue empty afterwards: disarm completely
    pub(super) fn handle_dequeue_tick(&mut self, generation: u64) -> CoreStep {
        if self.dequeue != (DequeueState::Armed { generation }) {
            debug!(generation, state = ?self.dequeue, "ignoring stale dequeue tick");
            return CoreStep::default();
        }

        let mut commands = Vec::new();

        let Some(task) = self.queue.pop_front() else {
            debug!("dequeue tick on empty queue");
            self.disarm(&mut commands);
            return self.finish(commands);
        };

        let is_async = task.is_async();
        match self.execute_task(task, &mut commands) {
            Some(process) => self.dequeue = DequeueState::AwaitingExit { process },
            None => self.dequeue = DequeueState::Idle,
        }

        if self.queue.is_empty() {
            self.disarm(&mut commands);
        } else if !is_async {
            self.arm_dequeue(&mut commands);
        }

        self.finish(commands)
    }

    /// Run one task. Returns the spawned process for asynchronous tasks.
    fn execute_task(&mut self, task: Task, commands: &mut Vec<CoreCommand>) -> Option<ProcessId> {
        let Task { label, kind } = task;
        debug!(task = %label, "running task");

        match kind {
            TaskKind::Plain(run) => {
                run_trapped(&label, run);
                None
            }
            TaskKind::InSink(run) => {
                let sink = self.sink.as_mut();
                run_trapped(&label, || run(sink));
                run_trapped(&label, || self.sink.persist());
                None
            }
            TaskKind::ExternalProcess(spec) => Some(self.start_process(label, spec, commands)),
            TaskKind::Epilogue => {
                self.admission.reset();
                self.stop_progress(commands);
                None
            }
        }
    }

    fn start_process(
        &mut self,
        label: String,
        spec: ProcessSpec,
        commands: &mut Vec<CoreCommand>,
    ) -> ProcessId {
        self.kill_live(commands);

        let id = ProcessId(self.next_process_id);
        self.next_process_id += 1;

        info!(process_id = %id, command = %spec.command, target = ?spec.target, "starting process");
        self.live = Some(LiveProcess {
            id,
            label,
            target: OutputTarget::for_selector(spec.target),
            on_exit: spec.on_exit,
        });
        commands.push(CoreCommand::SpawnProcess {
            id,
            command: spec.command,
        });
        id
    }

    pub(super) fn handle_process_output(&mut self, id: ProcessId, chunk: &str) -> CoreStep {
        match self.live.as_mut().filter(|live| live.id == id) {
            Some(live) => live.target.write(self.sink.as_mut(), chunk),
            None => debug!(process_id = %id, "dropping output from a process that is no longer live"),
        }
        CoreStep::default()
    }

    /// Run the exit action of the live process, drop its scratch buffer and
    /// re-arm the dequeuer. Exits of killed processes are ignored.
    pub(super) fn handle_process_exit(&mut self, id: ProcessId, outcome: ProcessOutcome) -> CoreStep {
        let Some(live) = self.live.take_if(|live| live.id == id) else {
            debug!(process_id = %id, ?outcome, "ignoring exit of a process that is no longer live");
            return CoreStep::default();
        };

        info!(process_id = %id, ?outcome, task = %live.label, "process exited");

        let LiveProcess {
            label,
            target,
            on_exit,
            ..
        } = live;
        let ctx = ExitContext {
            outcome,
            scratch: target.scratch(),
            sink: self.sink.as_mut(),
            fs: self.fs.as_ref(),
        };
        run_trapped(&label, || on_exit.run(ctx));
        drop(target);

        let mut commands = Vec::new();
        if self.dequeue == (DequeueState::AwaitingExit { process: id }) {
            self.arm_dequeue(&mut commands);
        }
        self.finish(commands)
    }

    pub(super) fn handle_progress_tick(&mut self, generation: u64) -> CoreStep {
        if self.progress.accepts(generation) {
            self.reporter.tick();
        } else {
            debug!(generation, "ignoring stale progress tick");
        }
        CoreStep::default()
    }
}
