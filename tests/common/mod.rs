#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::oneshot;

use taskseq::engine::{
    Admission, CoreCommand, CoreRuntime, CoreStep, ProcessId, ProcessOutcome, RuntimeOptions,
    SchedulerEvent,
};
use taskseq::errors::SequencerError;
use taskseq::fs::mock::MockFileSystem;
use taskseq::sink::MemorySink;
use taskseq::task::Chain;
use taskseq_test_utils::recording::{RecordingReporter, Trace};

/// Drives a `CoreRuntime` by hand. The harness plays the IO shell: it keeps
/// the generation of the armed dequeue timer and fires it on `tick()`, and it
/// records the processes the core asked to spawn and kill.
pub struct Harness {
    pub core: CoreRuntime,
    pub sink: MemorySink,
    pub fs: MockFileSystem,
    pub reporter: RecordingReporter,
    pub trace: Trace,
    pub spawned: Vec<(ProcessId, String)>,
    pub killed: Vec<ProcessId>,
    pub exit_requested: bool,
    pending_dequeue: Option<u64>,
    progress_generation: Option<u64>,
}

impl Harness {
    pub fn new(options: RuntimeOptions) -> Self {
        let sink = MemorySink::new();
        let fs = MockFileSystem::new();
        let reporter = RecordingReporter::new();
        let core = CoreRuntime::new(
            options,
            Box::new(sink.clone()),
            Arc::new(fs.clone()),
            Box::new(reporter.clone()),
        );
        Self {
            core,
            sink,
            fs,
            reporter,
            trace: Trace::new(),
            spawned: Vec::new(),
            killed: Vec::new(),
            exit_requested: false,
            pending_dequeue: None,
            progress_generation: None,
        }
    }

    pub fn with_max_in_flight(max: usize) -> Self {
        Self::new(RuntimeOptions {
            max_in_flight: max,
            ..RuntimeOptions::default()
        })
    }

    /// Feed one event and apply the resulting commands.
    pub fn send(&mut self, event: SchedulerEvent) -> CoreStep {
        let step = self.core.step(event);
        for command in step.commands.iter() {
            match command {
                CoreCommand::ArmDequeue { generation, .. } => {
                    self.pending_dequeue = Some(*generation)
                }
                CoreCommand::CancelDequeue => self.pending_dequeue = None,
                CoreCommand::StartProgress { generation, .. } => {
                    self.progress_generation = Some(*generation)
                }
                CoreCommand::StopProgress => self.progress_generation = None,
                CoreCommand::SpawnProcess { id, command } => {
                    self.spawned.push((*id, command.clone()))
                }
                CoreCommand::KillProcess { id } => self.killed.push(*id),
                CoreCommand::RequestExit => self.exit_requested = true,
            }
        }
        step
    }

    fn submit_with(&mut self, chain: Chain, admission: Admission) -> Result<(), SequencerError> {
        let (reply_tx, mut reply_rx) = oneshot::channel();
        self.send(SchedulerEvent::Submit {
            chain,
            admission,
            reply: Some(reply_tx),
        });
        reply_rx
            .try_recv()
            .expect("core always answers a submission within the same step")
    }

    /// Top-level submission through the admission gate.
    pub fn submit(&mut self, chain: Chain) -> Result<(), SequencerError> {
        self.submit_with(chain, Admission::TopLevel)
    }

    /// Follow-up submission, bypassing the gate.
    pub fn follow_up(&mut self, chain: Chain) {
        self.submit_with(chain, Admission::FollowUp)
            .expect("follow-up submissions are never rejected");
    }

    pub fn pending_dequeue(&self) -> Option<u64> {
        self.pending_dequeue
    }

    pub fn progress_generation(&self) -> Option<u64> {
        self.progress_generation
    }

    /// Fire the armed dequeue timer. Returns `false` if none is armed.
    pub fn tick(&mut self) -> bool {
        match self.pending_dequeue.take() {
            Some(generation) => {
                self.send(SchedulerEvent::DequeueTick { generation });
                true
            }
            None => false,
        }
    }

    /// Tick until no dequeue timer is armed. Returns the number of ticks.
    pub fn run_until_blocked(&mut self) -> usize {
        let mut ticks = 0;
        while self.tick() {
            ticks += 1;
            assert!(ticks < 10_000, "dequeuer never settled");
        }
        ticks
    }

    pub fn output(&mut self, id: ProcessId, chunk: &str) {
        self.send(SchedulerEvent::ProcessOutput {
            id,
            chunk: chunk.to_string(),
        });
    }

    pub fn exit(&mut self, id: ProcessId) -> CoreStep {
        self.send(SchedulerEvent::ProcessExited {
            id,
            outcome: ProcessOutcome::Success,
        })
    }

    pub fn last_spawned(&self) -> ProcessId {
        self.spawned
            .last()
            .map(|(id, _)| *id)
            .expect("no process was spawned")
    }

    /// Run everything, letting every spawned process exit right away with
    /// the given output.
    pub fn drain(&mut self, process_output: &str) {
        loop {
            self.run_until_blocked();
            match self.core.live_process() {
                Some(id) => {
                    if !process_output.is_empty() {
                        self.output(id, process_output);
                    }
                    self.exit(id);
                }
                None => break,
            }
        }
    }
}
