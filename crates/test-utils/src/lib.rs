//! Shared helpers for the `taskseq` integration tests.
//!
//! - [`builders`]: config builders.
//! - [`fake_backend`]: a process backend driven by timers instead of `sh`.
//! - [`recording`]: execution traces and a counting progress reporter.

pub mod builders;
pub mod fake_backend;
pub mod recording;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured by the harness and only shown for failing tests
/// (or with `-- --nocapture`). Filter with `RUST_LOG`, e.g.
/// `RUST_LOG=taskseq=debug cargo test`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("test timed out after 5 seconds")
}
