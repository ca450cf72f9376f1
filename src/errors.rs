// src/errors.rs

//! Crate-wide error type and helpers.
//!
//! Task bodies return [`TaskError`]. The task-unit wrapper sorts the variants
//! into three buckets:
//! - [`TaskError::Failed`]: explicit failure, propagated to the scheduler.
//! - [`TaskError::Cancelled`]: cooperative cancellation, swallowed.
//! - everything else: unexpected, logged and swallowed.

use thiserror::Error;

use crate::scheduler::SchedulerError;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Task cancelled: {0}")]
    Cancelled(String),

    #[error("Task failed: {0}")]
    Failed(String),

    #[error("Task instance cannot be killed: {0}")]
    NotKillable(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    /// True for the cooperative-cancellation signal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Cancelled(_))
    }

    /// True for an explicit, scheduler-visible failure.
    pub fn is_explicit_failure(&self) -> bool {
        matches!(self, TaskError::Failed(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskError>;
