// src/exec/runner_loop.rs

//! Background loop that owns the single live process.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::{ProcessId, SchedulerEvent};
use crate::exec::backend::ProcessRequest;
use crate::exec::process_runner::run_process;

/// Requests accepted by the runner loop.
#[derive(Debug)]
pub enum RunnerRequest {
    Start(ProcessRequest),
    Kill(ProcessId),
}

/// Internal handle for the currently-running process.
///
/// - `cancel` asks the runner future to kill the child.
/// - `handle` is the Tokio task that is actually running the command.
struct ActiveProcess {
    id: ProcessId,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background runner loop.
///
/// The returned sender is what [`super::RealProcessBackend`] uses to pass
/// start/kill requests. **There is never more than one process running**:
/// starting a new one cancels (kills) the previous one without waiting for
/// it, and the killed process reports no exit.
pub fn spawn_runner(event_tx: mpsc::Sender<SchedulerEvent>) -> mpsc::Sender<RunnerRequest> {
    let (tx, mut rx) = mpsc::channel::<RunnerRequest>(32);

    tokio::spawn(async move {
        info!("process runner loop started");

        let mut active: Option<ActiveProcess> = None;

        while let Some(request) = rx.recv().await {
            match request {
                RunnerRequest::Start(request) => {
                    if let Some(mut previous) = active.take() {
                        cancel_process(&mut previous);
                    }
                    active = Some(start_process(request, &event_tx));
                }
                RunnerRequest::Kill(id) => match active.as_mut() {
                    Some(current) if current.id == id => {
                        cancel_process(current);
                        active = None;
                    }
                    _ => debug!(process_id = %id, "kill requested for a process that is not live"),
                },
            }
        }

        if let Some(mut current) = active.take() {
            cancel_process(&mut current);
        }
        info!("process runner loop finished (channel closed)");
    });

    tx
}

fn start_process(request: ProcessRequest, event_tx: &mpsc::Sender<SchedulerEvent>) -> ActiveProcess {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let event_tx = event_tx.clone();
    let id = request.id;

    let handle = tokio::spawn(async move {
        run_process(request, event_tx, cancel_rx).await;
        debug!(process_id = %id, "process runner future finished");
    });

    ActiveProcess {
        id,
        cancel: Some(cancel_tx),
        handle,
    }
}

fn cancel_process(existing: &mut ActiveProcess) {
    if existing.handle.is_finished() {
        debug!(process_id = %existing.id, "previous process already finished");
        return;
    }

    info!(process_id = %existing.id, "cancelling live process instance");

    if let Some(cancel) = existing.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(
                process_id = %existing.id,
                "process already finished while cancelling"
            );
        }
    } else {
        debug!(
            process_id = %existing.id,
            "no cancel sender present; process may already have been cancelled"
        );
    }
}
