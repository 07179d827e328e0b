// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Deserialize a config file without semantic checks.
///
/// Missing sections and keys are filled in by serde defaults. Use
/// [`load_and_validate`] unless you want to inspect an invalid file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

/// Same as [`load_from_path`], for TOML already in memory.
pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Read, deserialize and validate a config file.
///
/// Durations are parsed and chain steps checked here, so the returned
/// [`ConfigFile`] can be turned into runtime options and chains without
/// further error handling.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}
