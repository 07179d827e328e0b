// src/exec/process_runner.rs

//! Single process runner.

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{ProcessId, ProcessOutcome, SchedulerEvent};
use crate::exec::backend::ProcessRequest;

/// Run a single process, relaying stdout/stderr as `ProcessOutput` events
/// and emitting one `ProcessExited` event when it terminates.
///
/// - If the process cannot be started, a `Failed(-1)` exit is reported so
///   the queue keeps moving.
/// - If the cancel channel fires, the child is killed and **no** exit event
///   is sent for it. Output it produced so far may or may not have been
///   relayed.
pub async fn run_process(
    request: ProcessRequest,
    event_tx: mpsc::Sender<SchedulerEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let id = request.id;
    if let Err(err) = run_process_inner(request, &event_tx, cancel_rx).await {
        error!(process_id = %id, error = %format!("{err:#}"), "process execution error");
        let _ = event_tx
            .send(SchedulerEvent::ProcessExited {
                id,
                outcome: ProcessOutcome::Failed(-1),
            })
            .await;
    }
}

async fn run_process_inner(
    request: ProcessRequest,
    event_tx: &mpsc::Sender<SchedulerEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    let id = request.id;
    info!(process_id = %id, cmd = %request.command, "starting process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&request.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&request.command);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process `{}`", request.command))?;

    let mut relays = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        relays.push(spawn_relay(id, stdout, event_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        relays.push(spawn_relay(id, stderr, event_tx.clone()));
    }

    // Either the process exits on its own (normal case), or a newer process
    // or a hard reset asks us to stop it.
    tokio::select! {
        status_res = child.wait() => {
            let status = status_res.with_context(|| {
                format!("waiting for process `{}`", request.command)
            })?;

            // Everything the process wrote must reach the target before the
            // exit action runs.
            for relay in relays {
                if let Err(e) = relay.await {
                    warn!(process_id = %id, error = %e, "output relay task failed");
                }
            }

            let code = status.code().unwrap_or(-1);
            let outcome = if status.success() {
                ProcessOutcome::Success
            } else {
                ProcessOutcome::Failed(code)
            };

            info!(
                process_id = %id,
                exit_code = code,
                success = status.success(),
                "process exited"
            );

            event_tx
                .send(SchedulerEvent::ProcessExited { id, outcome })
                .await
                .map_err(|_| anyhow!("sending exit of process {id} to scheduler"))?;
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(process_id = %id, "kill requested; killing process");
                    if let Err(e) = child.kill().await {
                        warn!(process_id = %id, error = %e, "failed to kill child process");
                    }
                }
                Err(e) => {
                    debug!(
                        process_id = %id,
                        error = %e,
                        "cancel channel closed without explicit cancellation"
                    );
                    // Child will be killed on drop due to kill_on_drop(true).
                }
            }
            for relay in relays {
                relay.abort();
            }
            // Do NOT report an exit for a killed process.
        }
    }

    Ok(())
}

/// Forward raw output, line by line with line endings kept, as
/// `ProcessOutput` events. Bytes are not interpreted beyond lossy UTF-8.
fn spawn_relay<R>(id: ProcessId, stream: R, event_tx: mpsc::Sender<SchedulerEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let chunk = String::from_utf8_lossy(&buf).into_owned();
                    if event_tx
                        .send(SchedulerEvent::ProcessOutput { id, chunk })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    debug!(process_id = %id, error = %e, "output stream read failed");
                    break;
                }
            }
        }
    })
}
