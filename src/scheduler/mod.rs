// src/scheduler/mod.rs

//! Scheduler contract.
//!
//! The framework only needs a narrow slice of a job scheduler: submit a job,
//! see what is executing, interrupt by key, and hear about every finished
//! execution. [`JobScheduler`] captures that slice so a persistent external
//! scheduler can be plugged in; [`LocalScheduler`] is the in-process
//! implementation used by the CLI and the tests.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::errors::Result;
use crate::task::{TaskDescriptor, TaskExit, TaskUnit};

pub mod local;
pub mod registry;

pub use local::LocalScheduler;
pub use registry::{JobFactory, JobRegistry};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("job '{0}' already exists and replace_existing is false")]
    JobExists(String),

    #[error("no factory registered for job type '{0}'")]
    UnknownJobType(String),

    #[error("unsupported trigger for job '{key}': {trigger}")]
    UnsupportedTrigger { key: String, trigger: String },

    #[error("job '{0}' has no triggers")]
    NoTriggers(String),

    #[error("scheduler is shut down")]
    ShutDown,
}

/// When a job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Fire once, immediately.
    Now,
    /// Fire every `Duration`, first firing one period from now.
    Interval(Duration),
    /// Cron expression, interpreted by schedulers that support one.
    Cron(String),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Now => write!(f, "now"),
            Trigger::Interval(d) => write!(f, "every {d:?}"),
            Trigger::Cron(expr) => write!(f, "cron '{expr}'"),
        }
    }
}

/// One currently executing task instance.
#[derive(Clone)]
pub struct ExecutingJob {
    pub key: String,
    pub instance: Arc<dyn TaskUnit>,
    pub fired_at: SystemTime,
}

impl fmt::Debug for ExecutingJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutingJob")
            .field("key", &self.key)
            .field("fired_at", &self.fired_at)
            .finish_non_exhaustive()
    }
}

/// Notification sent to listeners after every execution.
///
/// `error` is set only when the execution reported a failure to the
/// scheduler (explicit failure, invalid context, or the task could not be
/// built).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobExecution {
    pub key: String,
    pub exit: Option<TaskExit>,
    pub error: Option<String>,
}

/// Global "job finished" listener. Every execution is delivered to every
/// listener; listeners filter by key themselves.
pub trait JobListener: Send + Sync {
    fn job_was_executed(&self, execution: &JobExecution) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type ScheduleFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<(), SchedulerError>> + Send + 'a>>;

/// Contract the framework consumes from a job scheduler.
pub trait JobScheduler: Send + Sync {
    /// Submit `descriptor` with `triggers`. With `replace_existing`, a job
    /// already stored under the same key has its triggers replaced; running
    /// instances are left alone.
    fn schedule_job<'a>(
        &'a self,
        descriptor: &'a TaskDescriptor,
        triggers: Vec<Trigger>,
        replace_existing: bool,
    ) -> ScheduleFuture<'a>;

    fn currently_executing(&self) -> Vec<ExecutingJob>;

    /// Best-effort cooperative interrupt of every executing instance of
    /// `key`. Returns whether any instance was signalled.
    fn interrupt(&self, key: &str) -> bool;

    fn add_listener(&self, listener: Arc<dyn JobListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId) -> bool;

    fn is_executing(&self, key: &str) -> bool {
        self.currently_executing().iter().any(|j| j.key == key)
    }
}
