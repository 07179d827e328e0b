#![allow(dead_code)]

use std::path::PathBuf;

use taskseq::config::{ChainConfig, ConfigFile, ConfigSection, RawConfigFile, StepConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                chains: Vec::new(),
            },
        }
    }

    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.config.chains.push(chain);
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.config.config.max_in_flight = max;
        self
    }

    pub fn with_tick_delay(mut self, delay: &str) -> Self {
        self.config.config.tick_delay = delay.to_string();
        self
    }

    pub fn with_sink(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config.sink = path.into();
        self
    }

    /// The raw, unvalidated config (for tests of validation itself).
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ChainConfig`.
pub struct ChainConfigBuilder {
    chain: ChainConfig,
}

impl ChainConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            chain: ChainConfig {
                name: name.to_string(),
                steps: Vec::new(),
            },
        }
    }

    pub fn print(self, text: &str) -> Self {
        self.step(StepConfig::Print {
            text: text.to_string(),
        })
    }

    pub fn append(self, text: &str) -> Self {
        self.step(StepConfig::Append {
            text: text.to_string(),
        })
    }

    pub fn write_file(self, path: impl Into<PathBuf>, text: &str) -> Self {
        self.step(StepConfig::WriteFile {
            path: path.into(),
            text: text.to_string(),
        })
    }

    pub fn shell(self, cmd: &str) -> Self {
        self.step(StepConfig::Shell {
            cmd: cmd.to_string(),
            to_file: None,
            discard: false,
        })
    }

    pub fn shell_to_file(self, cmd: &str, path: impl Into<PathBuf>) -> Self {
        self.step(StepConfig::Shell {
            cmd: cmd.to_string(),
            to_file: Some(path.into()),
            discard: false,
        })
    }

    pub fn shell_discard(self, cmd: &str) -> Self {
        self.step(StepConfig::Shell {
            cmd: cmd.to_string(),
            to_file: None,
            discard: true,
        })
    }

    pub fn persist(self) -> Self {
        self.step(StepConfig::Persist)
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.chain.steps.push(step);
        self
    }

    pub fn build(self) -> ChainConfig {
        self.chain
    }
}
