// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, StepConfig};
use crate::errors::{Result, SequencerError};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SequencerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw)?;
        let tick_delay = positive_duration("tick_delay", &raw.config.tick_delay)?;
        let progress_tick = positive_duration("progress_tick", &raw.config.progress_tick)?;
        validate_chains(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.chains,
            tick_delay,
            progress_tick,
        ))
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_in_flight == 0 {
        return Err(SequencerError::ConfigError(
            "[config].max_in_flight must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.sink.as_os_str().is_empty() {
        return Err(SequencerError::ConfigError(
            "[config].sink must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn positive_duration(field: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value)
        .map_err(|e| SequencerError::ConfigError(format!("[config].{field}: {e}")))?;
    if dur.is_zero() {
        return Err(SequencerError::ConfigError(format!(
            "[config].{field} must be greater than zero"
        )));
    }
    Ok(dur)
}

fn validate_chains(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();

    for chain in cfg.chains.iter() {
        if chain.name.trim().is_empty() {
            return Err(SequencerError::ConfigError(
                "every [[chain]] needs a non-empty name".to_string(),
            ));
        }
        if !seen.insert(chain.name.as_str()) {
            return Err(SequencerError::ConfigError(format!(
                "duplicate chain name '{}'",
                chain.name
            )));
        }
        if chain.steps.is_empty() {
            return Err(SequencerError::ConfigError(format!(
                "chain '{}' has no [[chain.step]] entries",
                chain.name
            )));
        }

        for (idx, step) in chain.steps.iter().enumerate() {
            validate_step(&chain.name, idx, step)?;
        }
    }

    Ok(())
}

fn validate_step(chain: &str, idx: usize, step: &StepConfig) -> Result<()> {
    match step {
        StepConfig::Shell {
            cmd,
            to_file,
            discard,
        } => {
            if cmd.trim().is_empty() {
                return Err(SequencerError::ConfigError(format!(
                    "chain '{chain}' step {idx}: `cmd` must not be empty"
                )));
            }
            if to_file.is_some() && *discard {
                return Err(SequencerError::ConfigError(format!(
                    "chain '{chain}' step {idx}: `to_file` and `discard` are mutually exclusive"
                )));
            }
        }
        StepConfig::WriteFile { path, .. } => {
            if path.as_os_str().is_empty() {
                return Err(SequencerError::ConfigError(format!(
                    "chain '{chain}' step {idx}: `path` must not be empty"
                )));
            }
        }
        StepConfig::Print { .. } | StepConfig::Append { .. } | StepConfig::Persist => {}
    }
    Ok(())
}
