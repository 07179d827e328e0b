// src/sink.rs

//! Output destinations for task results.
//!
//! - [`ResultSink`] is the long-lived result surface. The scheduler only ever
//!   appends text to it and asks it to persist; it never reads it back.
//! - [`ScratchBuffer`] is a disposable destination for intermediate process
//!   output. One is created per process that asks for it and dropped once
//!   that process's exit action has run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;

/// Long-lived destination for results.
pub trait ResultSink: Send {
    fn append_text(&mut self, text: &str);

    /// Flush everything appended so far to the sink's persistence target.
    fn persist(&mut self) -> Result<()>;
}

/// Which destination an external process writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkSelector {
    /// Append straight into the long-lived [`ResultSink`].
    ResultSink,
    /// Collect into a fresh [`ScratchBuffer`] that is destroyed after use.
    Scratch,
}

/// Disposable text buffer for process output that isn't a final result.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    text: String,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Resolved output target of the live process.
#[derive(Debug)]
pub enum OutputTarget {
    ResultSink,
    Scratch(ScratchBuffer),
}

impl OutputTarget {
    pub fn for_selector(selector: SinkSelector) -> Self {
        match selector {
            SinkSelector::ResultSink => OutputTarget::ResultSink,
            SinkSelector::Scratch => OutputTarget::Scratch(ScratchBuffer::new()),
        }
    }

    /// Route a chunk of process output to this target.
    pub fn write(&mut self, sink: &mut dyn ResultSink, chunk: &str) {
        match self {
            OutputTarget::ResultSink => sink.append_text(chunk),
            OutputTarget::Scratch(buf) => buf.push_str(chunk),
        }
    }

    pub fn scratch(&self) -> Option<&ScratchBuffer> {
        match self {
            OutputTarget::Scratch(buf) => Some(buf),
            OutputTarget::ResultSink => None,
        }
    }
}

/// Sink that accumulates text in memory and writes the whole buffer to a
/// file on every `persist`.
pub struct FileSink {
    path: PathBuf,
    buffer: String,
    fs: Arc<dyn FileSystem>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            buffer: String::new(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl ResultSink for FileSink {
    fn append_text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn persist(&mut self) -> Result<()> {
        debug!(path = ?self.path, bytes = self.buffer.len(), "persisting result sink");
        self.fs.write(&self.path, self.buffer.as_bytes())
    }
}

/// In-memory sink. Clones share state, which makes it convenient for
/// embedding callers and tests that want to look at the results.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkState>>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    text: String,
    persisted: String,
    persist_count: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far.
    pub fn text(&self) -> String {
        self.inner.lock().unwrap().text.clone()
    }

    /// Snapshot taken by the most recent `persist`.
    pub fn persisted(&self) -> String {
        self.inner.lock().unwrap().persisted.clone()
    }

    pub fn persist_count(&self) -> usize {
        self.inner.lock().unwrap().persist_count
    }
}

impl ResultSink for MemorySink {
    fn append_text(&mut self, text: &str) {
        self.inner.lock().unwrap().text.push_str(text);
    }

    fn persist(&mut self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.persisted = state.text.clone();
        state.persist_count += 1;
        Ok(())
    }
}
