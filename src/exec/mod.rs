// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the commands of
//! asynchronous tasks, using `tokio::process::Command`, and reporting back to
//! the scheduler via `SchedulerEvent`s.
//!
//! - [`runner_loop`] owns the single live process slot.
//! - [`process_runner`] runs one process and relays its output.
//! - [`backend`] provides the `ProcessBackend` trait and a concrete
//!   `RealProcessBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod process_runner;
pub mod runner_loop;

pub use backend::{ProcessBackend, ProcessRequest, RealProcessBackend};
pub use runner_loop::spawn_runner;
