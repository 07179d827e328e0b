// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskseq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskseq",
    version,
    about = "Run chains of commands strictly in order, one process at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskseq.toml` in the current working directory. The file is
    /// optional when `--grep` is given.
    #[arg(long, value_name = "PATH", default_value = "Taskseq.toml")]
    pub config: String,

    /// Write results to this file instead of `[config].sink`.
    #[arg(long, value_name = "PATH")]
    pub sink: Option<PathBuf>,

    /// Search for PATTERN with grep and submit the search as its own chain.
    #[arg(long, value_name = "PATTERN")]
    pub grep: Option<String>,

    /// File to search (repeatable).
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Directory to search recursively (repeatable).
    #[arg(long = "dir", value_name = "PATH")]
    pub dirs: Vec<PathBuf>,

    /// Only search files whose name matches this glob (repeatable, e.g. `*.rs`).
    #[arg(long = "include", value_name = "GLOB")]
    pub includes: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSEQ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the chains, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
