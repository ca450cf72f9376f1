// src/task/unit.rs

//! The abstract unit of work and its execution wrapper.
//!
//! A concrete task implements [`TaskUnit::execute_task`]. The scheduler never
//! calls that directly; it goes through [`run_task_unit`], which owns the
//! progress lifecycle and the error policy:
//!
//! | body result            | store cleared | outcome                      |
//! |------------------------|---------------|------------------------------|
//! | `Ok(())`               | yes           | `Ok(TaskExit::Clean)`        |
//! | `TaskError::Failed`    | no            | `Err(..)` (scheduler-visible)|
//! | `TaskError::Cancelled` | no            | `Ok(TaskExit::Cancelled)`    |
//! | anything else          | no            | `Ok(TaskExit::Errored)`      |

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, error, warn};

use crate::errors::{Result, TaskError};
use crate::progress::ProgressStore;
use crate::task::{JobContext, TaskInstanceKey};

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A schedulable, cooperatively cancellable unit of work.
pub trait TaskUnit: Send + Sync {
    /// The task body.
    ///
    /// Long bodies should call [`check_for_interrupt`] at safe checkpoints
    /// (e.g. once per item) so an interrupt can stop them.
    fn execute_task<'a>(
        &'a self,
        ctx: &'a JobContext,
        progress: &'a ProgressStore,
    ) -> TaskFuture<'a>;

    /// Forcefully stop the instance (tree-kill of its attached process).
    ///
    /// Tasks without an external process cannot be killed.
    fn kill(&self) -> Result<()> {
        Err(TaskError::NotKillable(
            "task has no attached process to kill".to_string(),
        ))
    }
}

/// Terminal state of one execution that did not propagate an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    Clean,
    Cancelled,
    Errored,
}

/// Run one firing of `unit`.
///
/// Returns `Err` only for an invalid context or an explicit failure raised by
/// the body; both are meant for the scheduler.
pub async fn run_task_unit(
    unit: &dyn TaskUnit,
    ctx: &JobContext,
    progress: &ProgressStore,
) -> Result<TaskExit> {
    let key = job_key(ctx)?.to_string();

    progress.set_progress(&key, 0);
    debug!(key = %key, "task started");

    match unit.execute_task(ctx, progress).await {
        Ok(()) => {
            progress.clear_data(&key);
            debug!(key = %key, "task finished cleanly");
            Ok(TaskExit::Clean)
        }
        Err(err) if err.is_explicit_failure() => {
            error!(key = %key, error = %err, "task reported failure");
            Err(err)
        }
        Err(err) if err.is_cancellation() => {
            warn!(key = %key, error = %err, "task was interrupted");
            Ok(TaskExit::Cancelled)
        }
        Err(err) => {
            error!(key = %key, error = %err, "task failed with unexpected error");
            Ok(TaskExit::Errored)
        }
    }
}

/// Fail with the cancellation signal if the context was interrupted.
pub fn check_for_interrupt(ctx: &JobContext) -> Result<()> {
    if ctx.is_interrupted() {
        return Err(TaskError::Cancelled(format!(
            "{} was interrupted",
            ctx.raw_key()
        )));
    }
    Ok(())
}

/// Validated instance key of the firing described by `ctx`.
pub fn job_key(ctx: &JobContext) -> Result<TaskInstanceKey> {
    ctx.raw_key().parse()
}
