// src/engine/admission.rs

use tracing::{debug, warn};

use crate::errors::{Result, SequencerError};

/// Bounded counter of top-level requests that have not fully drained.
///
/// The counter only goes back to zero when the epilogue runs (or on a hard
/// reset), i.e. once the entire backlog has completed. A burst of `max`
/// requests is accepted; the next one is rejected until the queue drains.
#[derive(Debug)]
pub struct AdmissionGate {
    in_flight: usize,
    max: usize,
}

impl AdmissionGate {
    /// `max` is clamped to at least 1; a zero-capacity gate would reject
    /// everything.
    pub fn new(max: usize) -> Self {
        Self {
            in_flight: 0,
            max: max.max(1),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Count a new top-level request, or reject it when at capacity.
    pub fn try_admit(&mut self) -> Result<()> {
        if self.in_flight >= self.max {
            warn!(
                in_flight = self.in_flight,
                max = self.max,
                "too many requests in flight; rejecting submission"
            );
            return Err(SequencerError::AdmissionRejected {
                in_flight: self.in_flight,
                max: self.max,
            });
        }
        self.in_flight += 1;
        debug!(in_flight = self.in_flight, max = self.max, "request admitted");
        Ok(())
    }

    pub fn reset(&mut self) {
        if self.in_flight != 0 {
            debug!(released = self.in_flight, "admission counter reset");
        }
        self.in_flight = 0;
    }
}
