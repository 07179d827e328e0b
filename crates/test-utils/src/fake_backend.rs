use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use taskseq::engine::{ProcessId, ProcessOutcome, SchedulerEvent};
use taskseq::errors::Result;
use taskseq::exec::{ProcessBackend, ProcessRequest};

use crate::recording::Trace;

/// What the backend was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Spawn { id: ProcessId, command: String },
    Kill { id: ProcessId },
}

#[derive(Debug, Clone)]
struct Script {
    output: String,
    delay: Duration,
    outcome: ProcessOutcome,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<FakeCall>,
    scripts: HashMap<String, Script>,
    killed: HashSet<ProcessId>,
}

/// Shared control surface for [`FakeProcessBackend`].
///
/// Commands without a script behave like a tiny shell: `echo X` outputs
/// `X\n`, anything else outputs nothing. Both exit successfully after
/// `default_delay`.
#[derive(Debug, Clone)]
pub struct FakeController {
    state: Arc<Mutex<FakeState>>,
    trace: Option<Trace>,
    default_delay: Duration,
}

impl FakeController {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            trace: None,
            default_delay: Duration::from_millis(10),
        }
    }

    /// Record `spawn:<cmd>` and `exit:<cmd>` entries into `trace`.
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Make `command` print `output` and exit after `delay`.
    pub fn script(&self, command: &str, output: &str, delay: Duration) {
        self.script_with_outcome(command, output, delay, ProcessOutcome::Success);
    }

    pub fn script_with_outcome(
        &self,
        command: &str,
        output: &str,
        delay: Duration,
        outcome: ProcessOutcome,
    ) {
        self.state.lock().unwrap().scripts.insert(
            command.to_string(),
            Script {
                output: output.to_string(),
                delay,
                outcome,
            },
        );
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn spawned_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::Spawn { command, .. } => Some(command),
                FakeCall::Kill { .. } => None,
            })
            .collect()
    }

    pub fn killed(&self) -> Vec<ProcessId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::Kill { id } => Some(id),
                FakeCall::Spawn { .. } => None,
            })
            .collect()
    }

    /// Build a backend reporting to `event_tx`. Pass this as the
    /// `make_backend` argument of `Sequencer::start_with_backend`.
    pub fn backend(&self, event_tx: mpsc::Sender<SchedulerEvent>) -> FakeProcessBackend {
        FakeProcessBackend {
            controller: self.clone(),
            event_tx,
        }
    }

    fn script_for(&self, command: &str) -> Script {
        if let Some(script) = self.state.lock().unwrap().scripts.get(command) {
            return script.clone();
        }
        let output = command
            .strip_prefix("echo ")
            .map(|rest| format!("{rest}\n"))
            .unwrap_or_default();
        Script {
            output,
            delay: self.default_delay,
            outcome: ProcessOutcome::Success,
        }
    }

    fn is_killed(&self, id: ProcessId) -> bool {
        self.state.lock().unwrap().killed.contains(&id)
    }
}

impl Default for FakeController {
    fn default() -> Self {
        Self::new()
    }
}

/// Process backend that simulates processes with Tokio timers.
pub struct FakeProcessBackend {
    controller: FakeController,
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl ProcessBackend for FakeProcessBackend {
    fn spawn(
        &mut self,
        request: ProcessRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let controller = self.controller.clone();
        let tx = self.event_tx.clone();

        Box::pin(async move {
            let ProcessRequest { id, command } = request;
            {
                let mut state = controller.state.lock().unwrap();
                // Single live process: everything spawned earlier is gone.
                let earlier: Vec<ProcessId> = state
                    .calls
                    .iter()
                    .filter_map(|c| match c {
                        FakeCall::Spawn { id, .. } => Some(*id),
                        FakeCall::Kill { .. } => None,
                    })
                    .collect();
                state.killed.extend(earlier);
                state.calls.push(FakeCall::Spawn {
                    id,
                    command: command.clone(),
                });
            }
            if let Some(trace) = &controller.trace {
                trace.record(format!("spawn:{command}"));
            }

            let script = controller.script_for(&command);
            tokio::spawn(async move {
                tokio::time::sleep(script.delay).await;
                if controller.is_killed(id) {
                    return;
                }
                if !script.output.is_empty() {
                    let _ = tx
                        .send(SchedulerEvent::ProcessOutput {
                            id,
                            chunk: script.output.clone(),
                        })
                        .await;
                }
                if let Some(trace) = &controller.trace {
                    trace.record(format!("exit:{command}"));
                }
                let _ = tx
                    .send(SchedulerEvent::ProcessExited {
                        id,
                        outcome: script.outcome,
                    })
                    .await;
            });
            Ok(())
        })
    }

    fn kill(&mut self, id: ProcessId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let controller = self.controller.clone();

        Box::pin(async move {
            let mut state = controller.state.lock().unwrap();
            state.calls.push(FakeCall::Kill { id });
            state.killed.insert(id);
            Ok(())
        })
    }
}
