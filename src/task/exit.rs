// src/task/exit.rs

//! Actions run when an external process exits.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::engine::ProcessOutcome;
use crate::fs::{append_preserving, FileSystem};
use crate::sink::{ResultSink, ScratchBuffer};

/// Custom exit handler.
pub type ExitFn = Box<dyn FnOnce(ExitContext<'_>) -> Result<()> + Send>;

/// What to do once the process of an asynchronous task has terminated.
pub enum ExitAction {
    Nothing,
    /// Persist the result sink.
    PersistSink,
    /// Write the scratch output to a file, after any existing content.
    WriteToFile(PathBuf),
    Custom(ExitFn),
}

impl ExitAction {
    pub fn custom<F>(f: F) -> Self
    where
        F: FnOnce(ExitContext<'_>) -> Result<()> + Send + 'static,
    {
        ExitAction::Custom(Box::new(f))
    }

    pub fn run(self, ctx: ExitContext<'_>) -> Result<()> {
        match self {
            ExitAction::Nothing => Ok(()),
            ExitAction::PersistSink => ctx.sink.persist(),
            ExitAction::WriteToFile(path) => {
                let Some(scratch) = ctx.scratch else {
                    bail!("no scratch output to write to {:?}", path);
                };
                append_preserving(ctx.fs, &path, scratch.as_str())
            }
            ExitAction::Custom(f) => f(ctx),
        }
    }
}

impl fmt::Debug for ExitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitAction::Nothing => f.write_str("Nothing"),
            ExitAction::PersistSink => f.write_str("PersistSink"),
            ExitAction::WriteToFile(path) => f.debug_tuple("WriteToFile").field(path).finish(),
            ExitAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Everything an exit action may touch.
pub struct ExitContext<'a> {
    pub outcome: ProcessOutcome,
    /// Captured output when the process wrote to a scratch buffer.
    pub scratch: Option<&'a ScratchBuffer>,
    pub sink: &'a mut dyn ResultSink,
    pub fs: &'a dyn FileSystem,
}
