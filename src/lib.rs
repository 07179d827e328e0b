// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod progress;
pub mod sink;
pub mod task;
pub mod types;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::backend::script::describe_step;
use crate::backend::{chain_from_config, prepare_search, GrepBackend, SearchRequest};
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::Sequencer;
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::GlyphSpinner;
use crate::sink::FileSink;
use crate::task::Chain;
use crate::types::ProgressStyle;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - chain construction (config chains and the optional grep search)
/// - the sequencer with the real process backend and a file sink
/// - Ctrl-C handling
///
/// Chains are submitted in config order through the admission gate. Once all
/// of them are in, the runtime is told to finish when idle, and the process
/// exits after the queue has drained.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_config(&config_path, args.grep.is_some())?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let sink_path = args.sink.clone().unwrap_or_else(|| cfg.config.sink.clone());

    let mut chains: Vec<(String, Chain)> = cfg
        .chains
        .iter()
        .map(|c| (c.name.clone(), chain_from_config(c, Arc::clone(&fs))))
        .collect();

    let search = args.grep.as_ref().map(|pattern| SearchRequest {
        pattern: pattern.clone(),
        files: args.files.clone(),
        dirs: args.dirs.clone(),
        source_file: std::env::temp_dir().join(format!("taskseq-{}.files", std::process::id())),
        includes: args.includes.clone(),
    });
    if let Some(ref request) = search {
        // Missing tools fail here, before anything is queued.
        let chain = prepare_search(&GrepBackend::new(Arc::clone(&fs)), request)?;
        chains.push(("grep".to_string(), chain));
    }

    if args.dry_run {
        print_dry_run(&cfg, &sink_path, search.as_ref(), &chains);
        return Ok(());
    }

    if chains.is_empty() {
        bail!(
            "nothing to run: {} has no [[chain]] and --grep was not given",
            config_path.display()
        );
    }

    let options = cfg.runtime_options();

    let sink = Box::new(FileSink::new(&sink_path, Arc::clone(&fs)));
    let sequencer = Sequencer::start(options, sink, fs);
    let handle = sequencer.handle();

    if cfg.config.progress == ProgressStyle::Spinner && std::io::stderr().is_terminal() {
        handle
            .set_reporter(Box::new(GlyphSpinner::stderr("taskseq")))
            .await?;
    }

    // Ctrl-C → hard reset; the loop exits once it has been told to finish.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = handle.stop_all().await;
        });
    }

    for (name, chain) in chains {
        match handle.submit_chain(chain).await {
            Ok(()) => info!(chain = %name, "chain accepted"),
            Err(e) if e.is_admission_rejected() => {
                eprintln!("taskseq: chain '{name}' rejected: {e}");
            }
            Err(e) => {
                warn!(chain = %name, error = %e, "could not submit chain");
                return Err(e.into());
            }
        }
    }

    // Only now may the loop stop: every chain is already queued or rejected.
    handle.finish_when_idle().await?;
    sequencer.wait().await?;
    info!(sink = %sink_path.display(), "all chains finished");
    Ok(())
}

/// Load the config file, falling back to defaults when a search was
/// requested and no config file exists.
fn load_config(path: &Path, search_requested: bool) -> Result<ConfigFile> {
    if search_requested && !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults for search");
        return Ok(ConfigFile::try_from(RawConfigFile::default())?);
    }
    Ok(load_and_validate(path)?)
}

/// Simple dry-run output: print limits, chains and steps.
fn print_dry_run(
    cfg: &ConfigFile,
    sink_path: &Path,
    search: Option<&SearchRequest>,
    chains: &[(String, Chain)],
) {
    println!("taskseq dry-run");
    println!("  config.max_in_flight = {}", cfg.config.max_in_flight);
    println!("  config.tick_delay = {}", cfg.config.tick_delay);
    println!("  config.progress_tick = {}", cfg.config.progress_tick);
    println!("  sink = {}", sink_path.display());
    println!();

    println!("chains ({}):", chains.len());
    for chain in cfg.chains.iter() {
        println!("  - {}", chain.name);
        for step in chain.steps.iter() {
            println!("      {}", describe_step(step));
        }
    }

    if let Some(request) = search {
        println!("  - grep {:?}", request.pattern);
        if let Some((_, chain)) = chains.iter().find(|(name, _)| name == "grep") {
            for task in chain.iter() {
                match task.command() {
                    Some(cmd) => println!("      shell `{cmd}`"),
                    None => println!("      {}", task.label()),
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
