// src/process/mod.rs

//! External process supervision.
//!
//! - [`supervisor`] spawns a command with `tokio::process::Command`, streams
//!   stdout/stderr line by line to callbacks and supports cancellation.
//! - [`handle`] provides the [`ProcessHandle`] kill surface and the
//!   [`ProcessSlot`] that process-backed tasks use to remember their child.
//!
//! Tasks depend on the [`ProcessRunner`] trait rather than on the supervisor
//! directly, so tests can swap in a scripted runner.

pub mod handle;
pub mod supervisor;

pub use handle::{ChildHandle, ProcessHandle, ProcessSlot};
pub use supervisor::{
    run_process, LineCallback, ProcessCommand, ProcessFuture, ProcessHooks, ProcessOutput,
    ProcessRunner, ProcessSupervisor, StartedCallback,
};
