// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::{ProcessBackend, ProcessRequest};

use super::core::CoreRuntime;
use super::{CoreCommand, SchedulerEvent};

/// Drives the core in response to `SchedulerEvent`s, owns the real timers,
/// and delegates process handling to a `ProcessBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics. Timers hold only a weak sender, so they never keep
/// the event channel open on their own.
pub struct Runtime<B: ProcessBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<SchedulerEvent>,
    timer_tx: mpsc::WeakSender<SchedulerEvent>,
    backend: B,
    dequeue_timer: Option<JoinHandle<()>>,
    progress_timer: Option<JoinHandle<()>>,
}

impl<B: ProcessBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> Runtime<B> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<SchedulerEvent>,
        event_tx: &mpsc::Sender<SchedulerEvent>,
        backend: B,
    ) -> Self {
        Self {
            core,
            event_rx,
            timer_tx: event_tx.downgrade(),
            backend,
            dequeue_timer: None,
            progress_timer: None,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `SchedulerEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (timers, processes, exit).
    pub async fn run(mut self) -> Result<()> {
        info!("taskseq runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("scheduler event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.cancel_dequeue_timer();
        self.cancel_progress_timer();
        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::ArmDequeue { generation, delay } => {
                self.arm_dequeue_timer(generation, delay);
            }
            CoreCommand::CancelDequeue => self.cancel_dequeue_timer(),
            CoreCommand::StartProgress { generation, period } => {
                self.start_progress_timer(generation, period);
            }
            CoreCommand::StopProgress => self.cancel_progress_timer(),
            CoreCommand::SpawnProcess { id, command } => {
                debug!(process_id = %id, "dispatching process to backend");
                self.backend.spawn(ProcessRequest { id, command }).await?;
            }
            CoreCommand::KillProcess { id } => {
                self.backend.kill(id).await?;
            }
            CoreCommand::RequestExit => {
                // keep_running=false already ends the loop; just log it.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    fn arm_dequeue_timer(&mut self, generation: u64, delay: Duration) {
        self.cancel_dequeue_timer();
        let tx = self.timer_tx.clone();
        self.dequeue_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(SchedulerEvent::DequeueTick { generation }).await;
            }
        }));
    }

    fn cancel_dequeue_timer(&mut self) {
        if let Some(timer) = self.dequeue_timer.take() {
            timer.abort();
        }
    }

    fn start_progress_timer(&mut self, generation: u64, period: Duration) {
        self.cancel_progress_timer();
        let tx = self.timer_tx.clone();
        self.progress_timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else { break };
                if tx
                    .send(SchedulerEvent::ProgressTick { generation })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    fn cancel_progress_timer(&mut self) {
        if let Some(timer) = self.progress_timer.take() {
            timer.abort();
        }
    }
}
