// src/backend/mod.rs

//! Producers of task chains.
//!
//! Backends turn a request into a [`Chain`] built only from the task
//! factories; the scheduler consumes the result through
//! `SequencerHandle::submit_chain` and knows nothing else about them.
//!
//! - [`grep`] searches files with `find` + `grep`.
//! - [`script`] turns `[[chain]]` config tables into chains.

pub mod grep;
pub mod script;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, SequencerError};
use crate::task::Chain;

pub use grep::GrepBackend;
pub use script::chain_from_config;

/// Inputs of a search backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// What to search for.
    pub pattern: String,
    /// Files searched as given.
    pub files: Vec<PathBuf>,
    /// Directories searched recursively.
    pub dirs: Vec<PathBuf>,
    /// Scratch file that collects the list of files to search.
    pub source_file: PathBuf,
    /// File-name globs that restrict the directory walk (e.g. `*.rs`).
    pub includes: Vec<String>,
}

/// A search tool that can express a request as a chain of tasks.
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// External programs the chain will run.
    fn required_tools(&self, request: &SearchRequest) -> Vec<&'static str>;

    fn build_chain(&self, request: &SearchRequest) -> Result<Chain>;
}

/// Check that every tool `backend` needs is on `PATH`, then build the chain.
///
/// Fails before anything is submitted, so a missing tool never touches the
/// queue.
pub fn prepare_search(backend: &dyn SearchBackend, request: &SearchRequest) -> Result<Chain> {
    let path_var = std::env::var("PATH").unwrap_or_default();
    for tool in backend.required_tools(request) {
        match resolve_in_path(tool, &path_var) {
            Some(found) => debug!(backend = backend.name(), tool, path = %found.display(), "tool found"),
            None => return Err(SequencerError::MissingTool(tool.to_string())),
        }
    }
    backend.build_chain(request)
}

/// Find an executable called `name` in a `PATH`-style list.
pub fn resolve_in_path(name: &str, path_var: &str) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Quote `arg` for a POSIX shell command line.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
