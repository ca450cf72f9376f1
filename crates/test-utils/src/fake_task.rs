use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use shelfjobs::errors::{Result, TaskError};
use shelfjobs::progress::ProgressStore;
use shelfjobs::scheduler::JobRegistry;
use shelfjobs::task::{check_for_interrupt, job_key, JobContext, TaskFuture, TaskUnit};

/// How a [`ControlledTask`] body behaves.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Publish 50% and return `Ok`.
    Succeed,
    /// Return `TaskError::Failed`.
    FailExplicitly,
    /// Return an unexpected (process) error.
    ErrorUnexpectedly,
    /// Run until the scheduler interrupts it.
    RunUntilInterrupted,
    /// Ignore interrupts; finish after the duration or when killed.
    IgnoreInterrupts(Duration),
}

/// Counters shared by every instance built from one registration.
#[derive(Default)]
pub struct TaskCounters {
    started: AtomicUsize,
    finished: AtomicUsize,
    kill_calls: AtomicUsize,
    killed: Notify,
}

impl TaskCounters {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn kill_calls(&self) -> usize {
        self.kill_calls.load(Ordering::SeqCst)
    }
}

pub struct ControlledTask {
    behaviour: Behaviour,
    killable: bool,
    counters: Arc<TaskCounters>,
}

impl ControlledTask {
    pub fn new(behaviour: Behaviour, killable: bool, counters: Arc<TaskCounters>) -> Self {
        Self {
            behaviour,
            killable,
            counters,
        }
    }

    async fn body(&self, ctx: &JobContext, progress: &ProgressStore) -> Result<()> {
        let key = job_key(ctx)?.to_string();
        match self.behaviour {
            Behaviour::Succeed => {
                progress.set_progress(&key, 50);
                progress.set_message(&key, "halfway");
                Ok(())
            }
            Behaviour::FailExplicitly => Err(TaskError::Failed("scripted failure".to_string())),
            Behaviour::ErrorUnexpectedly => {
                progress.set_progress(&key, 10);
                Err(TaskError::Process("scripted crash".to_string()))
            }
            Behaviour::RunUntilInterrupted => {
                progress.set_progress(&key, 5);
                ctx.cancellation().cancelled().await;
                check_for_interrupt(ctx)
            }
            Behaviour::IgnoreInterrupts(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => Ok(()),
                    _ = self.counters.killed.notified() => {
                        Err(TaskError::Cancelled("killed".to_string()))
                    }
                }
            }
        }
    }
}

impl TaskUnit for ControlledTask {
    fn execute_task<'a>(
        &'a self,
        ctx: &'a JobContext,
        progress: &'a ProgressStore,
    ) -> TaskFuture<'a> {
        Box::pin(async move {
            self.counters.started.fetch_add(1, Ordering::SeqCst);
            let result = self.body(ctx, progress).await;
            self.counters.finished.fetch_add(1, Ordering::SeqCst);
            result
        })
    }

    fn kill(&self) -> Result<()> {
        self.counters.kill_calls.fetch_add(1, Ordering::SeqCst);
        if self.killable {
            self.counters.killed.notify_one();
            Ok(())
        } else {
            Err(TaskError::NotKillable("controlled task refuses to die".to_string()))
        }
    }
}

/// Register `job_type` so every firing builds a [`ControlledTask`] sharing
/// the returned counters.
pub fn register_controlled(
    registry: &mut JobRegistry,
    job_type: &str,
    behaviour: Behaviour,
    killable: bool,
) -> Arc<TaskCounters> {
    let counters = Arc::new(TaskCounters::default());
    let shared = Arc::clone(&counters);
    registry.register(job_type, move |_| {
        let task = ControlledTask::new(behaviour, killable, Arc::clone(&shared));
        Ok(Arc::new(task) as Arc<dyn TaskUnit>)
    });
    counters
}
