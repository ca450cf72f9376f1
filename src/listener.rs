// src/listener.rs

//! One-shot rendezvous on a task instance finishing.

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::errors::{Result, TaskError};
use crate::scheduler::{JobExecution, JobListener};
use crate::task::TaskInstanceKey;

/// Resolves once, when the target key's first execution after registration
/// finishes: `true` if it carried no error, `false` otherwise.
///
/// Register it with the scheduler *before* submitting the job so the
/// notification cannot be missed. Later notifications are ignored.
#[derive(Debug)]
pub struct CompletionListener {
    target: String,
    outcome: watch::Sender<Option<bool>>,
}

impl CompletionListener {
    pub fn new(target: &TaskInstanceKey) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            target: target.to_string(),
            outcome,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn outcome(&self) -> Option<bool> {
        *self.outcome.borrow()
    }

    /// Wait up to `timeout` for the outcome. `None` means the timeout
    /// elapsed; callers treat that as "still running".
    pub async fn wait(&self, timeout: Duration) -> Option<bool> {
        let mut rx = self.outcome.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            // The sender lives in `self`, so the channel cannot close here.
            rx.wait_for(Option::is_some).await.ok().and_then(|v| *v)
        })
        .await;

        match waited {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(key = %self.target, ?timeout, "completion wait timed out");
                None
            }
        }
    }

    fn resolve(&self, success: bool) -> bool {
        // send_if_modified runs the closure under the channel lock, so only
        // the first resolution wins.
        self.outcome.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(success);
            true
        })
    }
}

impl JobListener for CompletionListener {
    fn job_was_executed(&self, execution: &JobExecution) -> Result<()> {
        if execution.key.trim().is_empty() {
            return Err(TaskError::Argument(
                "job execution notification without a key".to_string(),
            ));
        }
        if execution.key != self.target {
            return Ok(());
        }

        let success = execution.error.is_none();
        if self.resolve(success) {
            debug!(key = %self.target, success, "completion listener resolved");
        }
        Ok(())
    }
}
