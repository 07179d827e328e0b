// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The runtime talks to a `ProcessBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake backend in tests while keeping
//! the production implementation in [`super::runner_loop`].
//!
//! Contract for every implementation:
//! - `spawn` starts the process and, once it terminates on its own, emits
//!   exactly one `SchedulerEvent::ProcessExited` for its id (after any
//!   `ProcessOutput` events). A process that cannot be started still gets an
//!   exit event, with a failed outcome.
//! - `spawn` kills any process that is still live first.
//! - `kill` is idempotent. A killed process emits no exit event.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::{ProcessId, SchedulerEvent};
use crate::errors::{Error, Result};

use super::runner_loop::{spawn_runner, RunnerRequest};

/// A process the scheduler wants started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub id: ProcessId,
    /// Shell command line.
    pub command: String,
}

/// Trait abstracting how external processes are started and killed.
///
/// Production code uses [`RealProcessBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send {
    fn spawn(
        &mut self,
        request: ProcessRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn kill(&mut self, id: ProcessId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real process backend used in production.
///
/// Internally, this just forwards requests to the runner loop spawned by
/// [`spawn_runner`], which owns the live process slot.
pub struct RealProcessBackend {
    tx: mpsc::Sender<RunnerRequest>,
}

impl RealProcessBackend {
    /// Create a new real backend, wiring it to the given scheduler event
    /// sender.
    ///
    /// This spawns the background runner loop immediately.
    pub fn new(event_tx: mpsc::Sender<SchedulerEvent>) -> Self {
        let tx = spawn_runner(event_tx);
        Self { tx }
    }
}

impl ProcessBackend for RealProcessBackend {
    fn spawn(
        &mut self,
        request: ProcessRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(RunnerRequest::Start(request))
                .await
                .map_err(|e| Error::msg(format!("process runner is gone: {e}")))?;
            Ok(())
        })
    }

    fn kill(&mut self, id: ProcessId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(RunnerRequest::Kill(id))
                .await
                .map_err(|e| Error::msg(format!("process runner is gone: {e}")))?;
            Ok(())
        })
    }
}
