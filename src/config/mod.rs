// src/config/mod.rs

//! Configuration loading and validation for taskseq.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate scheduler limits, durations and chain shapes (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{ChainConfig, ConfigFile, ConfigSection, RawConfigFile, StepConfig};
