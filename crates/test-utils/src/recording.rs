use std::sync::{Arc, Mutex};

use taskseq::progress::ProgressReporter;
use taskseq::task::Task;

/// Shared, ordered record of what happened during a test.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == entry)
    }

    /// A plain task that records `entry` when it runs.
    pub fn task(&self, entry: &str) -> Task {
        let trace = self.clone();
        let entry = entry.to_string();
        Task::plain(format!("record {entry}"), move || {
            trace.record(entry);
            Ok(())
        })
    }

    /// A plain task that records `entry` and then fails.
    pub fn failing_task(&self, entry: &str) -> Task {
        let trace = self.clone();
        let entry = entry.to_string();
        Task::plain(format!("fail {entry}"), move || {
            trace.record(entry);
            anyhow::bail!("injected failure")
        })
    }
}

/// Progress reporter that counts ticks and `done` signals.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    counts: Arc<Mutex<(usize, usize)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> usize {
        self.counts.lock().unwrap().0
    }

    pub fn dones(&self) -> usize {
        self.counts.lock().unwrap().1
    }
}

impl ProgressReporter for RecordingReporter {
    fn tick(&mut self) {
        self.counts.lock().unwrap().0 += 1;
    }

    fn done(&mut self) {
        self.counts.lock().unwrap().1 += 1;
    }
}
