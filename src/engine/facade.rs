// src/engine/facade.rs

//! Public entry point for collaborators.
//!
//! [`Sequencer`] owns the runtime loop; [`SequencerHandle`] is the cheap,
//! cloneable handle used to submit chains and to stop everything. Every call
//! becomes a `SchedulerEvent`, so all state changes happen on the loop's own
//! turn, never re-entrantly inside the caller.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{Error, Result, SequencerError};
use crate::exec::{ProcessBackend, RealProcessBackend};
use crate::fs::FileSystem;
use crate::progress::{NoopReporter, ProgressReporter};
use crate::sink::ResultSink;
use crate::task::Chain;

use super::core::CoreRuntime;
use super::runtime::Runtime;
use super::{Admission, RuntimeOptions, SchedulerEvent};

/// Capacity of the scheduler event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owner of a running scheduler loop.
#[derive(Debug)]
pub struct Sequencer {
    handle: SequencerHandle,
    join: JoinHandle<Result<()>>,
}

impl Sequencer {
    /// Start a scheduler loop with the real process backend.
    ///
    /// Progress is silent until a reporter is installed with
    /// [`SequencerHandle::set_reporter`]; the CLI installs a
    /// [`GlyphSpinner`](crate::progress::GlyphSpinner) on stderr when it is
    /// a terminal.
    pub fn start(
        options: RuntimeOptions,
        sink: Box<dyn ResultSink>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self::start_with_backend(options, sink, fs, RealProcessBackend::new)
    }

    /// Start a scheduler loop with a custom process backend.
    ///
    /// `make_backend` receives the event sender the backend must report
    /// process output and exits on. The reporter starts as [`NoopReporter`],
    /// as with [`Sequencer::start`].
    pub fn start_with_backend<B, F>(
        options: RuntimeOptions,
        sink: Box<dyn ResultSink>,
        fs: Arc<dyn FileSystem>,
        make_backend: F,
    ) -> Self
    where
        B: ProcessBackend + 'static,
        F: FnOnce(mpsc::Sender<SchedulerEvent>) -> B,
    {
        let (tx, rx) = mpsc::channel::<SchedulerEvent>(EVENT_CHANNEL_CAPACITY);
        let backend = make_backend(tx.clone());
        let core = CoreRuntime::new(options, sink, fs, Box::new(NoopReporter));
        let runtime = Runtime::new(core, rx, &tx, backend);
        let join = tokio::spawn(runtime.run());

        Self {
            handle: SequencerHandle { tx },
            join,
        }
    }

    pub fn handle(&self) -> SequencerHandle {
        self.handle.clone()
    }

    /// Hard-reset and stop the loop, waiting for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        if self
            .handle
            .tx
            .send(SchedulerEvent::ShutdownRequested)
            .await
            .is_err()
        {
            debug!("runtime already stopped before shutdown");
        }
        self.wait().await
    }

    /// Wait for the loop to stop on its own (e.g. `exit_when_idle`).
    pub async fn wait(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| Error::msg(format!("runtime task failed: {e}")))?
    }
}

/// Cloneable handle to a running scheduler.
#[derive(Debug, Clone)]
pub struct SequencerHandle {
    tx: mpsc::Sender<SchedulerEvent>,
}

impl SequencerHandle {
    /// Submit a top-level chain through the admission gate.
    ///
    /// Resolves to [`SequencerError::AdmissionRejected`] when too many
    /// requests are in flight; nothing is enqueued in that case.
    pub async fn submit_chain(&self, chain: Chain) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SchedulerEvent::Submit {
            chain,
            admission: Admission::TopLevel,
            reply: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| SequencerError::Closed)?
    }

    /// Append follow-up work for an already admitted request. Bypasses the
    /// admission gate.
    pub async fn chain(&self, chain: Chain) -> Result<()> {
        self.send(SchedulerEvent::Submit {
            chain,
            admission: Admission::FollowUp,
            reply: None,
        })
        .await
    }

    /// Non-async variant of [`Self::chain`], usable from inside a running
    /// task body. The chain is appended on the loop's next turn.
    pub fn try_chain(&self, chain: Chain) -> Result<()> {
        self.tx
            .try_send(SchedulerEvent::Submit {
                chain,
                admission: Admission::FollowUp,
                reply: None,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Closed(_) => SequencerError::Closed,
                mpsc::error::TrySendError::Full(_) => {
                    SequencerError::Other(Error::msg("scheduler event channel is full"))
                }
            })
    }

    /// Drop all pending tasks, kill the live process, reset admission.
    pub async fn stop_all(&self) -> Result<()> {
        self.send(SchedulerEvent::StopAll).await
    }

    /// Let the loop stop once all work submitted so far has drained.
    ///
    /// Batch callers submit every chain first and call this last, so a chain
    /// that drains early never closes the loop under a later submission.
    pub async fn finish_when_idle(&self) -> Result<()> {
        self.send(SchedulerEvent::FinishWhenIdle).await
    }

    /// Swap the progress reporter.
    pub async fn set_reporter(&self, reporter: Box<dyn ProgressReporter>) -> Result<()> {
        self.send(SchedulerEvent::SetReporter(reporter)).await
    }

    async fn send(&self, event: SchedulerEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| SequencerError::Closed)
    }
}
