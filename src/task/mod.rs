// src/task/mod.rs

//! Units of queued work.
//!
//! A [`Task`] is either synchronous (runs to completion inside one scheduler
//! step) or asynchronous (starts an external process and hands control back;
//! the process exit resumes the queue). Tasks are built with the factory
//! functions on [`Task`] and grouped into a [`Chain`] for submission.
//!
//! - [`exit`] holds the actions that run when an external process exits.
//! - [`trap`] runs task bodies with failure isolation.

pub mod exit;
pub mod trap;

use std::fmt;
use std::path::PathBuf;

use crate::sink::{ResultSink, SinkSelector};

pub use exit::{ExitAction, ExitContext, ExitFn};
pub use trap::run_trapped;

/// Body of a plain synchronous task.
pub type PlainFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Body of a task that writes into the result sink.
pub type SinkFn = Box<dyn FnOnce(&mut dyn ResultSink) -> anyhow::Result<()> + Send>;

/// Description of an external process step.
pub struct ProcessSpec {
    /// Shell command line, run through `sh -c` (or `cmd /C` on Windows).
    pub command: String,
    pub target: SinkSelector,
    pub on_exit: ExitAction,
}

pub(crate) enum TaskKind {
    Plain(PlainFn),
    InSink(SinkFn),
    ExternalProcess(ProcessSpec),
    /// Queue terminator: resets admission and stops progress reporting.
    Epilogue,
}

/// One unit of queued work.
pub struct Task {
    pub(crate) label: String,
    pub(crate) kind: TaskKind,
}

impl Task {
    /// Synchronous task wrapping `run`.
    pub fn plain<F>(label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            kind: TaskKind::Plain(Box::new(run)),
        }
    }

    /// Synchronous task that runs with the result sink handed in, then
    /// persists the sink. A failure inside `run` is logged and the sink is
    /// still persisted.
    pub fn in_sink<F>(label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(&mut dyn ResultSink) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            kind: TaskKind::InSink(Box::new(run)),
        }
    }

    /// Asynchronous task: start `command` with output routed per `target`
    /// and run `on_exit` once the process has terminated.
    ///
    /// Starting the process kills any process that is still live.
    pub fn external_process(
        command: impl Into<String>,
        target: SinkSelector,
        on_exit: ExitAction,
    ) -> Self {
        let command = command.into();
        Self {
            label: format!("process `{command}`"),
            kind: TaskKind::ExternalProcess(ProcessSpec {
                command,
                target,
                on_exit,
            }),
        }
    }

    /// Run `command` into a scratch buffer and, on exit, add the captured
    /// output to `path` after whatever the file already contains.
    pub fn external_process_to_file(command: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::external_process(
            command,
            SinkSelector::Scratch,
            ExitAction::WriteToFile(path.into()),
        )
    }

    /// Run `command` straight into the result sink and persist it on exit.
    pub fn external_process_to_sink(command: impl Into<String>) -> Self {
        Self::external_process(command, SinkSelector::ResultSink, ExitAction::PersistSink)
    }

    pub(crate) fn epilogue() -> Self {
        Self {
            label: "epilogue".to_string(),
            kind: TaskKind::Epilogue,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this task hands control back before its work is finished.
    pub fn is_async(&self) -> bool {
        matches!(self.kind, TaskKind::ExternalProcess(_))
    }

    pub fn is_epilogue(&self) -> bool {
        matches!(self.kind, TaskKind::Epilogue)
    }

    /// Command line of an external process task.
    pub fn command(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::ExternalProcess(spec) => Some(&spec.command),
            _ => None,
        }
    }

    /// Whether the task may be appended to a queue.
    ///
    /// Rejects blank commands, file exits that have no scratch output to
    /// write, and the queue terminator itself.
    pub fn is_valid(&self) -> bool {
        match &self.kind {
            TaskKind::Plain(_) | TaskKind::InSink(_) => true,
            TaskKind::ExternalProcess(spec) => {
                if spec.command.trim().is_empty() {
                    return false;
                }
                !matches!(
                    (&spec.on_exit, spec.target),
                    (ExitAction::WriteToFile(_), SinkSelector::ResultSink)
                )
            }
            TaskKind::Epilogue => false,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TaskKind::Plain(_) => "plain",
            TaskKind::InSink(_) => "in_sink",
            TaskKind::ExternalProcess(_) => "external_process",
            TaskKind::Epilogue => "epilogue",
        };
        f.debug_struct("Task")
            .field("label", &self.label)
            .field("kind", &kind)
            .field("command", &self.command())
            .finish()
    }
}

/// An ordered group of tasks submitted together.
#[derive(Debug, Default)]
pub struct Chain {
    tasks: Vec<Task>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn then(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

impl From<Vec<Task>> for Chain {
    fn from(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

impl FromIterator<Task> for Chain {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}
