// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A backend needs an external program that is not on `PATH`.
    #[error("Required tool not found on PATH: {0}")]
    MissingTool(String),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The admission gate is at capacity; nothing was enqueued.
    #[error("Too many requests in flight ({in_flight}/{max}); submission rejected")]
    AdmissionRejected { in_flight: usize, max: usize },

    /// The scheduler loop is no longer running.
    #[error("Sequencer is not running")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SequencerError {
    /// Returns `true` for the capacity rejection produced by the admission gate.
    pub fn is_admission_rejected(&self) -> bool {
        matches!(self, SequencerError::AdmissionRejected { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SequencerError>;
