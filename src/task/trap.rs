// src/task/trap.rs

//! Failure isolation for task bodies and exit actions.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// Run a task body, logging an `Err` or a panic instead of propagating it.
///
/// Returns `true` when the body completed successfully. Callers carry on the
/// same way either way; the flag only feeds logging and tests.
pub fn run_trapped<F>(label: &str, body: F) -> bool
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(task = %label, error = %format!("{err:#}"), "task failed; continuing");
            false
        }
        Err(payload) => {
            warn!(
                task = %label,
                panic = %panic_message(payload.as_ref()),
                "task panicked; continuing"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
