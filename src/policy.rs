// src/policy.rs

//! Scheduling policy shared by every concrete task's `schedule` factory.
//!
//! - `stop_if_running`: before submitting, interrupt any running instance of
//!   the key, poll until it is gone, and force-kill it if it will not stop.
//! - `wait_for_finish`: register a [`CompletionListener`] before submitting,
//!   then block the caller until the instance finishes (or the wait times
//!   out).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::listener::CompletionListener;
use crate::scheduler::{JobScheduler, ListenerId};
use crate::task::{TaskDescriptor, TaskInstanceKey};

/// How a new schedule request treats a running instance of the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub wait_for_finish: bool,
    pub stop_if_running: bool,
}

impl ScheduleOptions {
    pub fn wait() -> Self {
        Self {
            wait_for_finish: true,
            stop_if_running: false,
        }
    }

    pub fn replace() -> Self {
        Self {
            wait_for_finish: false,
            stop_if_running: true,
        }
    }
}

/// Timeouts used by the policy steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// How long `stop_if_running` waits for an interrupted instance.
    pub interrupt_timeout: Duration,
    /// How long `wait_for_finish` blocks the caller.
    pub wait_timeout: Duration,
    /// Poll period while waiting for an interrupted instance.
    pub poll_interval: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            interrupt_timeout: Duration::from_secs(30),
            wait_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// State carried from [`pre_schedule_steps`] to [`post_schedule_steps`].
#[derive(Debug)]
pub struct PendingSchedule {
    key: TaskInstanceKey,
    listener: Option<(ListenerId, Arc<CompletionListener>)>,
}

impl PendingSchedule {
    pub fn key(&self) -> &TaskInstanceKey {
        &self.key
    }

    pub fn is_waiting(&self) -> bool {
        self.listener.is_some()
    }
}

/// Steps run before the job is submitted.
pub async fn pre_schedule_steps(
    scheduler: &dyn JobScheduler,
    descriptor: &TaskDescriptor,
    options: ScheduleOptions,
    config: &PolicyConfig,
) -> PendingSchedule {
    let key = descriptor.key().clone();

    if options.stop_if_running {
        interrupt_and_wait(
            scheduler,
            &key.to_string(),
            config.interrupt_timeout,
            config.poll_interval,
        )
        .await;
    }

    let listener = if options.wait_for_finish {
        let listener = Arc::new(CompletionListener::new(&key));
        let id = scheduler.add_listener(listener.clone());
        debug!(key = %key, listener = id.0, "registered completion listener");
        Some((id, listener))
    } else {
        None
    };

    PendingSchedule { key, listener }
}

/// Steps run after the job is submitted.
///
/// Returns the completion outcome when the caller asked to wait and the
/// instance finished in time, `None` otherwise.
pub async fn post_schedule_steps(
    scheduler: &dyn JobScheduler,
    pending: PendingSchedule,
    config: &PolicyConfig,
) -> Option<bool> {
    let (id, listener) = pending.listener?;

    let outcome = listener.wait(config.wait_timeout).await;
    match outcome {
        Some(true) => debug!(key = %pending.key, "waited task finished successfully"),
        Some(false) => warn!(key = %pending.key, "waited task finished with failure"),
        None => info!(
            key = %pending.key,
            timeout = ?config.wait_timeout,
            "task still running after wait timeout; continuing"
        ),
    }

    scheduler.remove_listener(id);
    outcome
}

/// Interrupt every running instance of `key` and wait for it to go away.
///
/// Polls every `poll` for up to `timeout`. If the instance is still running
/// afterwards, each one is asked to `kill()`; failures are logged. Never
/// fails. Returns whether the key ended up idle.
pub async fn interrupt_and_wait(
    scheduler: &dyn JobScheduler,
    key: &str,
    timeout: Duration,
    poll: Duration,
) -> bool {
    if !scheduler.is_executing(key) {
        debug!(key, "nothing running; no interrupt needed");
        return true;
    }

    info!(key, ?timeout, "interrupting running instance before rescheduling");
    scheduler.interrupt(key);

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        tokio::time::sleep(poll.min(deadline.saturating_duration_since(Instant::now()))).await;
        if !scheduler.is_executing(key) {
            info!(key, "running instance stopped after interrupt");
            return true;
        }
    }

    warn!(key, ?timeout, "instance ignored interrupt; attempting kill");
    for job in scheduler.currently_executing().into_iter().filter(|j| j.key == key) {
        match job.instance.kill() {
            Ok(()) => info!(key, "kill issued to running instance"),
            Err(e) => error!(key, error = %e, "running instance could not be killed"),
        }
    }

    !scheduler.is_executing(key)
}

/// Apply the policy around `schedule_job` and return the instance key.
pub async fn schedule_task(
    scheduler: &dyn JobScheduler,
    descriptor: &TaskDescriptor,
    options: ScheduleOptions,
    config: &PolicyConfig,
) -> Result<String> {
    let pending = pre_schedule_steps(scheduler, descriptor, options, config).await;

    if let Err(err) = scheduler
        .schedule_job(descriptor, descriptor.triggers(), true)
        .await
    {
        if let Some((id, _)) = pending.listener {
            scheduler.remove_listener(id);
        }
        return Err(err.into());
    }

    let key = pending.key().to_string();
    post_schedule_steps(scheduler, pending, config).await;
    Ok(key)
}
