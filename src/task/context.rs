// src/task/context.rs

use tokio_util::sync::CancellationToken;

use crate::task::JobData;

/// Execution context the scheduler hands to one firing of a task.
///
/// `key` is kept as the raw string the scheduler supplied; [`job_key`]
/// validates it.
///
/// [`job_key`]: crate::task::job_key
#[derive(Debug, Clone)]
pub struct JobContext {
    key: String,
    data: JobData,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn new(key: impl Into<String>, data: JobData, cancel: CancellationToken) -> Self {
        Self {
            key: key.into(),
            data,
            cancel,
        }
    }

    pub fn raw_key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &JobData {
        &self.data
    }

    /// Token tripped by the scheduler's `interrupt`.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
