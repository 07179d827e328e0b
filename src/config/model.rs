// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::RuntimeOptions;
use crate::types::ProgressStyle;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// max_in_flight = 5
/// tick_delay = "300ms"
/// progress_tick = "100ms"
/// sink = "results.txt"
///
/// [[chain]]
/// name = "hello"
///
/// [[chain.step]]
/// kind = "print"
/// text = "a"
///
/// [[chain.step]]
/// kind = "shell"
/// cmd = "echo b"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Chains from `[[chain]]`, in file order.
    #[serde(default, rename = "chain")]
    pub chains: Vec<ChainConfig>,
}

/// Validated configuration.
///
/// Can only be built through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so the duration strings are known to parse.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub chains: Vec<ChainConfig>,
    tick_delay: Duration,
    progress_tick: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        chains: Vec<ChainConfig>,
        tick_delay: Duration,
        progress_tick: Duration,
    ) -> Self {
        Self {
            config,
            chains,
            tick_delay,
            progress_tick,
        }
    }

    /// Scheduler options described by `[config]`.
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            max_in_flight: self.config.max_in_flight,
            tick_delay: self.tick_delay,
            progress_tick: self.progress_tick,
            exit_when_idle: false,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of top-level requests in flight at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Delay between a synchronous step and the next dequeue.
    #[serde(default = "default_tick_delay")]
    pub tick_delay: String,

    /// Period of the progress indicator.
    #[serde(default = "default_progress_tick")]
    pub progress_tick: String,

    /// File the result sink persists to.
    #[serde(default = "default_sink")]
    pub sink: PathBuf,

    #[serde(default)]
    pub progress: ProgressStyle,
}

fn default_max_in_flight() -> usize {
    crate::engine::DEFAULT_MAX_IN_FLIGHT
}

fn default_tick_delay() -> String {
    "300ms".to_string()
}

fn default_progress_tick() -> String {
    "100ms".to_string()
}

fn default_sink() -> PathBuf {
    PathBuf::from("taskseq-results.txt")
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            tick_delay: default_tick_delay(),
            progress_tick: default_progress_tick(),
            sink: default_sink(),
            progress: ProgressStyle::default(),
        }
    }
}

/// `[[chain]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,

    /// Steps from `[[chain.step]]`, run in order.
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// `[[chain.step]]` table, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepConfig {
    /// Print `text` on stdout.
    Print { text: String },

    /// Append `text` to the result sink, then persist it.
    Append { text: String },

    /// Create or overwrite `path` with `text`.
    WriteFile { path: PathBuf, text: String },

    /// Run `cmd` in a shell.
    ///
    /// Output goes to the result sink unless `to_file` is set (captured and
    /// added to that file) or `discard` is true (captured and dropped).
    Shell {
        cmd: String,
        #[serde(default)]
        to_file: Option<PathBuf>,
        #[serde(default)]
        discard: bool,
    },

    /// Persist the result sink.
    Persist,
}
