// src/scheduler/local.rs

//! In-process scheduler driving task units on the Tokio runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::progress::ProgressStore;
use crate::scheduler::{
    ExecutingJob, JobExecution, JobListener, JobRegistry, JobScheduler, ListenerId,
    ScheduleFuture, SchedulerError, Trigger,
};
use crate::errors::Result;
use crate::task::{run_task_unit, JobContext, TaskDescriptor, TaskExit, TaskUnit};

struct Running {
    key: String,
    instance: Arc<dyn TaskUnit>,
    cancel: CancellationToken,
    fired_at: SystemTime,
}

struct StoredJob {
    descriptor: TaskDescriptor,
    triggers: CancellationToken,
    generation: u64,
    /// Has an interval trigger. One-shot jobs are forgotten after firing.
    repeating: bool,
}

struct Inner {
    registry: JobRegistry,
    progress: ProgressStore,
    jobs: Mutex<HashMap<String, StoredJob>>,
    executing: Mutex<HashMap<u64, Running>>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn JobListener>)>>,
    next_id: AtomicU64,
    /// Firings spawned but not yet finished (including ones waiting on a
    /// single-flight predecessor).
    in_flight: AtomicUsize,
    finished: Notify,
    shutdown: CancellationToken,
}

/// Scheduler that runs every firing in its own Tokio task.
///
/// - `Trigger::Now` fires once immediately; `Trigger::Interval` repeats until
///   the job is replaced or the scheduler shuts down. Cron triggers are
///   rejected.
/// - Each firing rebuilds the task from its descriptor's job data through the
///   [`JobRegistry`], then runs it via [`run_task_unit`].
/// - Descriptors with `disallow_concurrent` wait for the running instance of
///   the same key to finish before starting.
/// - Every listener hears about every finished firing, including one whose
///   body panicked (reported like an unexpected error).
/// - A job with only `Trigger::Now` triggers is forgotten once it has fired.
#[derive(Clone)]
pub struct LocalScheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalScheduler")
            .field("registry", &self.inner.registry)
            .field("in_flight", &self.inner.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl LocalScheduler {
    pub fn new(registry: JobRegistry, progress: ProgressStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                progress,
                jobs: Mutex::new(HashMap::new()),
                executing: Mutex::new(HashMap::new()),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                in_flight: AtomicUsize::new(0),
                finished: Notify::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.inner.progress
    }

    /// Keys of all stored jobs, sorted.
    pub fn job_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = lock(&self.inner.jobs).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn descriptor(&self, key: &str) -> Option<TaskDescriptor> {
        lock(&self.inner.jobs).get(key).map(|j| j.descriptor.clone())
    }

    /// Stop a job's future firings. Running instances are not touched.
    pub fn unschedule(&self, key: &str) -> bool {
        match lock(&self.inner.jobs).remove(key) {
            Some(job) => {
                job.triggers.cancel();
                info!(key, "job unscheduled");
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// True when no firing is executing or waiting to execute.
    pub fn is_idle(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Wait until [`is_idle`](Self::is_idle), up to `timeout`. Returns
    /// whether the scheduler became idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.inner.finished.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_idle() {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }

    /// Stop all triggers, interrupt running instances and wait up to
    /// `grace` for them to finish.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!("scheduler shutting down");
        self.inner.shutdown.cancel();
        let idle = self.wait_idle(grace).await;
        if !idle {
            let executing: Vec<_> = self
                .currently_executing()
                .into_iter()
                .map(|j| j.key)
                .collect();
            warn!(?executing, "instances still running after shutdown grace period");
        }
        idle
    }

    fn spawn_trigger(
        &self,
        descriptor: TaskDescriptor,
        trigger: Trigger,
        stop: CancellationToken,
        generation: u64,
    ) {
        let inner = Arc::clone(&self.inner);
        match trigger {
            Trigger::Now => {
                Inner::spawn_firing(inner, descriptor, stop, generation);
            }
            Trigger::Interval(every) => {
                tokio::spawn(async move {
                    let start = tokio::time::Instant::now() + every;
                    let mut ticker = tokio::time::interval_at(start, every);
                    loop {
                        tokio::select! {
                            _ = stop.cancelled() => break,
                            _ = ticker.tick() => {
                                Inner::spawn_firing(
                                    Arc::clone(&inner),
                                    descriptor.clone(),
                                    stop.clone(),
                                    generation,
                                );
                            }
                        }
                    }
                    debug!(key = %descriptor.key(), "interval trigger stopped");
                });
            }
            Trigger::Cron(expr) => {
                // schedule_job rejects these before we get here.
                warn!(key = %descriptor.key(), cron = %expr, "ignoring cron trigger");
            }
        }
    }
}

impl Inner {
    fn spawn_firing(
        inner: Arc<Inner>,
        descriptor: TaskDescriptor,
        stop: CancellationToken,
        generation: u64,
    ) {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = InFlight(Arc::clone(&inner));
        tokio::spawn(async move {
            let _in_flight = in_flight;
            inner.fire(&descriptor, &stop).await;
            inner.forget_one_shot(&descriptor.key().to_string(), generation);
        });
    }

    /// Drop a stored job that has no further firings, unless it was replaced
    /// in the meantime.
    fn forget_one_shot(&self, key: &str, generation: u64) {
        let mut jobs = lock(&self.jobs);
        let done = jobs
            .get(key)
            .is_some_and(|j| !j.repeating && j.generation == generation);
        if done {
            jobs.remove(key);
            debug!(key, "one-shot job forgotten after firing");
        }
    }

    /// Run the body on its own Tokio task so a panic surfaces as a
    /// `JoinError` instead of unwinding through the scheduler.
    async fn run_isolated(
        &self,
        instance: Arc<dyn TaskUnit>,
        ctx: JobContext,
    ) -> Result<TaskExit> {
        let key = ctx.raw_key().to_string();
        let progress = self.progress.clone();
        let body = tokio::spawn(async move {
            run_task_unit(instance.as_ref(), &ctx, &progress).await
        });
        match body.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                error!(key = %key, error = %err, "task panicked");
                Ok(TaskExit::Errored)
            }
            Err(err) => {
                error!(key = %key, error = %err, "task was aborted");
                Ok(TaskExit::Errored)
            }
        }
    }

    async fn fire(&self, descriptor: &TaskDescriptor, stop: &CancellationToken) {
        let key = descriptor.key().to_string();

        let instance = match self.registry.build(descriptor.job_type(), descriptor.data()) {
            Ok(instance) => instance,
            Err(err) => {
                error!(
                    key = %key,
                    job_type = descriptor.job_type(),
                    error = %err,
                    "failed to build task instance"
                );
                self.notify_listeners(JobExecution {
                    key,
                    exit: None,
                    error: Some(err.to_string()),
                });
                return;
            }
        };

        let cancel = self.shutdown.child_token();
        let Some(fire_id) = self
            .claim_slot(descriptor, &key, &instance, &cancel, stop)
            .await
        else {
            debug!(key = %key, "firing abandoned before start");
            return;
        };

        info!(key = %key, fire_id, title = descriptor.title(), "job fired");
        let ctx = JobContext::new(key.clone(), descriptor.data().clone(), cancel);
        let slot = Executing {
            inner: self,
            fire_id,
        };
        let result = self.run_isolated(instance, ctx).await;
        drop(slot);

        let execution = match result {
            Ok(exit) => {
                info!(key = %key, fire_id, ?exit, "job finished");
                JobExecution {
                    key,
                    exit: Some(exit),
                    error: None,
                }
            }
            Err(err) => {
                warn!(key = %key, fire_id, error = %err, "job finished with failure");
                JobExecution {
                    key,
                    exit: None,
                    error: Some(err.to_string()),
                }
            }
        };
        self.notify_listeners(execution);
    }

    /// Register the firing as executing. For single-flight descriptors this
    /// waits until no other instance of the key is running; the check and the
    /// insert happen under one lock.
    async fn claim_slot(
        &self,
        descriptor: &TaskDescriptor,
        key: &str,
        instance: &Arc<dyn TaskUnit>,
        cancel: &CancellationToken,
        stop: &CancellationToken,
    ) -> Option<u64> {
        let mut logged_wait = false;
        loop {
            let notified = self.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut executing = lock(&self.executing);
                let busy = descriptor.disallow_concurrent()
                    && executing.values().any(|r| r.key == key);
                if !busy {
                    let fire_id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    executing.insert(
                        fire_id,
                        Running {
                            key: key.to_string(),
                            instance: Arc::clone(instance),
                            cancel: cancel.clone(),
                            fired_at: SystemTime::now(),
                        },
                    );
                    return Some(fire_id);
                }
            }

            if !logged_wait {
                info!(key, "single-flight job already running; waiting for it to finish");
                logged_wait = true;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = stop.cancelled() => return None,
                _ = self.shutdown.cancelled() => return None,
            }
        }
    }

    fn notify_listeners(&self, execution: JobExecution) {
        let listeners: Vec<_> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            if let Err(err) = listener.job_was_executed(&execution) {
                warn!(key = %execution.key, error = %err, "job listener failed");
            }
        }
    }
}

impl JobScheduler for LocalScheduler {
    fn schedule_job<'a>(
        &'a self,
        descriptor: &'a TaskDescriptor,
        triggers: Vec<Trigger>,
        replace_existing: bool,
    ) -> ScheduleFuture<'a> {
        Box::pin(async move {
            let key = descriptor.key().to_string();

            if self.inner.shutdown.is_cancelled() {
                return Err(SchedulerError::ShutDown);
            }
            if triggers.is_empty() {
                return Err(SchedulerError::NoTriggers(key));
            }
            if let Some(cron) = triggers.iter().find(|t| matches!(t, Trigger::Cron(_))) {
                return Err(SchedulerError::UnsupportedTrigger {
                    key,
                    trigger: cron.to_string(),
                });
            }
            if !self.inner.registry.contains(descriptor.job_type()) {
                return Err(SchedulerError::UnknownJobType(
                    descriptor.job_type().to_string(),
                ));
            }

            let stop = self.inner.shutdown.child_token();
            let generation = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
            let repeating = triggers.iter().any(|t| matches!(t, Trigger::Interval(_)));
            {
                let mut jobs = lock(&self.inner.jobs);
                if let Some(existing) = jobs.get(&key) {
                    if !replace_existing {
                        return Err(SchedulerError::JobExists(key));
                    }
                    debug!(key = %key, "replacing existing job triggers");
                    existing.triggers.cancel();
                }
                jobs.insert(
                    key.clone(),
                    StoredJob {
                        descriptor: descriptor.clone(),
                        triggers: stop.clone(),
                        generation,
                        repeating,
                    },
                );
            }

            info!(
                key = %key,
                recovery = descriptor.recovery(),
                triggers = ?triggers,
                "job scheduled"
            );
            for trigger in triggers {
                self.spawn_trigger(descriptor.clone(), trigger, stop.clone(), generation);
            }
            Ok(())
        })
    }

    fn currently_executing(&self) -> Vec<ExecutingJob> {
        lock(&self.inner.executing)
            .values()
            .map(|r| ExecutingJob {
                key: r.key.clone(),
                instance: Arc::clone(&r.instance),
                fired_at: r.fired_at,
            })
            .collect()
    }

    fn interrupt(&self, key: &str) -> bool {
        let mut signalled = false;
        for running in lock(&self.inner.executing).values() {
            if running.key == key {
                running.cancel.cancel();
                signalled = true;
            }
        }
        if signalled {
            info!(key, "interrupt requested");
        } else {
            debug!(key, "interrupt requested but no instance is executing");
        }
        signalled
    }

    fn add_listener(&self, listener: Arc<dyn JobListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.inner.listeners).push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }
}

/// Counts a spawned firing until it is dropped, however it ends.
struct InFlight(Arc<Inner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.finished.notify_waiters();
    }
}

/// An entry in `executing`, removed on drop.
struct Executing<'a> {
    inner: &'a Inner,
    fire_id: u64,
}

impl Drop for Executing<'_> {
    fn drop(&mut self) {
        lock(&self.inner.executing).remove(&self.fire_id);
        self.inner.finished.notify_waiters();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Result, TaskError};
    use crate::listener::CompletionListener;
    use crate::task::{check_for_interrupt, job_key, TaskExit, TaskFuture};

    struct Sleepy {
        millis: u64,
        fail: bool,
    }

    impl TaskUnit for Sleepy {
        fn execute_task<'a>(
            &'a self,
            ctx: &'a JobContext,
            progress: &'a ProgressStore,
        ) -> TaskFuture<'a> {
            Box::pin(async move {
                let key = job_key(ctx)?.to_string();
                progress.set_message(&key, "sleeping");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(self.millis)) => {}
                    _ = ctx.cancellation().cancelled() => {}
                }
                check_for_interrupt(ctx)?;
                if self.fail {
                    return Err(TaskError::Failed("asked to fail".to_string()));
                }
                Ok(())
            })
        }
    }

    struct Panicky;

    impl TaskUnit for Panicky {
        fn execute_task<'a>(
            &'a self,
            ctx: &'a JobContext,
            progress: &'a ProgressStore,
        ) -> TaskFuture<'a> {
            Box::pin(async move {
                progress.set_message(ctx.raw_key(), "about to panic");
                let empty: Vec<i32> = Vec::new();
                progress.set_progress(ctx.raw_key(), empty[0]);
                Ok(())
            })
        }
    }

    struct Recorder(Mutex<Vec<JobExecution>>);

    impl JobListener for Recorder {
        fn job_was_executed(&self, execution: &JobExecution) -> Result<()> {
            self.0.lock().unwrap().push(execution.clone());
            Ok(())
        }
    }

    fn scheduler() -> LocalScheduler {
        let mut registry = JobRegistry::new();
        registry.register("sleepy", |data| {
            Ok(Arc::new(Sleepy {
                millis: data.get_int("millis")? as u64,
                fail: data.get_bool_or("fail", false)?,
            }) as Arc<dyn TaskUnit>)
        });
        registry.register("panicky", |_| Ok(Arc::new(Panicky) as Arc<dyn TaskUnit>));
        LocalScheduler::new(registry, ProgressStore::new())
    }

    fn sleepy(name: &str, millis: i64) -> TaskDescriptor {
        TaskDescriptor::builder("Test", name, "sleepy")
            .data("millis", millis)
            .disallow_concurrent(true)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn fires_now_and_notifies_listeners() {
        let sched = scheduler();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        sched.add_listener(recorder.clone());

        let desc = sleepy("A", 20);
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();
        assert!(sched.wait_idle(Duration::from_secs(5)).await);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![JobExecution {
                key: "Test.A".to_string(),
                exit: Some(TaskExit::Clean),
                error: None,
            }]
        );
        assert!(sched.progress().is_empty());
    }

    #[tokio::test]
    async fn explicit_failure_reaches_listeners() {
        let sched = scheduler();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let id = sched.add_listener(recorder.clone());

        let desc = TaskDescriptor::builder("Test", "Fails", "sleepy")
            .data("millis", 1i64)
            .data("fail", true)
            .build()
            .unwrap();
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();
        assert!(sched.wait_idle(Duration::from_secs(5)).await);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].error.as_deref().unwrap().contains("asked to fail"));
        assert!(sched.remove_listener(id));
        assert!(!sched.remove_listener(id));
    }

    #[tokio::test]
    async fn interrupt_stops_cooperative_task() {
        let sched = scheduler();
        let desc = sleepy("Long", 10_000);
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !sched.is_executing("Test.Long") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(sched.interrupt("Test.Long"));
        assert!(sched.wait_idle(Duration::from_secs(5)).await);
        // Cancelled exits leave progress behind.
        assert_eq!(sched.progress().get_message("Test.Long").as_deref(), Some("sleeping"));
        assert!(!sched.interrupt("Test.Long"));
    }

    #[tokio::test]
    async fn single_flight_serializes_firings() {
        let sched = scheduler();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        sched.add_listener(recorder.clone());

        let desc = sleepy("Serial", 100);
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            sched
                .currently_executing()
                .iter()
                .filter(|j| j.key == "Test.Serial")
                .count(),
            1
        );

        assert!(sched.wait_idle(Duration::from_secs(5)).await);
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_invalid_submissions() {
        let sched = scheduler();
        let desc = sleepy("X", 1);

        sched.schedule_job(&desc, vec![Trigger::Interval(Duration::from_secs(60))], false)
            .await
            .unwrap();
        assert!(matches!(
            sched.schedule_job(&desc, desc.triggers(), false).await,
            Err(SchedulerError::JobExists(_))
        ));
        assert!(matches!(
            sched.schedule_job(&desc, vec![], true).await,
            Err(SchedulerError::NoTriggers(_))
        ));
        assert!(matches!(
            sched.schedule_job(&desc, vec![Trigger::Cron("0 * * * * ?".into())], true).await,
            Err(SchedulerError::UnsupportedTrigger { .. })
        ));

        let unknown = TaskDescriptor::builder("Test", "Y", "nope").build().unwrap();
        assert!(matches!(
            sched.schedule_job(&unknown, unknown.triggers(), true).await,
            Err(SchedulerError::UnknownJobType(_))
        ));

        assert_eq!(sched.job_keys(), vec!["Test.X".to_string()]);
        assert!(sched.unschedule("Test.X"));
        assert!(sched.shutdown(Duration::from_secs(1)).await);
        assert!(matches!(
            sched.schedule_job(&desc, desc.triggers(), true).await,
            Err(SchedulerError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn interval_trigger_repeats_until_unscheduled() {
        let sched = scheduler();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        sched.add_listener(recorder.clone());

        let desc = sleepy("Tick", 1);
        sched
            .schedule_job(&desc, vec![Trigger::Interval(Duration::from_millis(40))], true)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(sched.unschedule("Test.Tick"));
        assert!(sched.wait_idle(Duration::from_secs(5)).await);

        let fired = recorder.0.lock().unwrap().len();
        assert!(fired >= 2, "expected at least two firings, got {fired}");
    }

    #[tokio::test]
    async fn panicking_body_is_reported_and_releases_its_slot() {
        let sched = scheduler();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        sched.add_listener(recorder.clone());

        let desc = TaskDescriptor::builder("Test", "Panics", "panicky")
            .disallow_concurrent(true)
            .build()
            .unwrap();
        let completion = Arc::new(CompletionListener::new(desc.key()));
        sched.add_listener(completion.clone());
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();

        // Reported like any unexpected error: a success to waiters.
        assert_eq!(completion.wait(Duration::from_secs(5)).await, Some(true));
        assert!(sched.wait_idle(Duration::from_secs(5)).await);
        assert!(!sched.is_executing("Test.Panics"));

        // A second single-flight firing of the same key is not blocked.
        sched.schedule_job(&desc, desc.triggers(), true).await.unwrap();
        assert!(sched.wait_idle(Duration::from_secs(5)).await);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|e| e.exit == Some(TaskExit::Errored)));
        assert_eq!(
            sched.progress().get_message("Test.Panics").as_deref(),
            Some("about to panic")
        );
    }

    #[tokio::test]
    async fn one_shot_jobs_are_forgotten_after_firing() {
        let sched = scheduler();
        let desc = sleepy("Once", 50);
        sched.schedule_job(&desc, desc.triggers(), false).await.unwrap();
        assert!(sched.descriptor("Test.Once").is_some());

        assert!(sched.wait_idle(Duration::from_secs(5)).await);
        assert!(sched.job_keys().is_empty());
        assert!(sched.descriptor("Test.Once").is_none());

        // With the old entry gone, a non-replacing submission is accepted.
        sched.schedule_job(&desc, desc.triggers(), false).await.unwrap();
        assert!(sched.wait_idle(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn replacement_survives_the_old_firing_finishing() {
        let sched = scheduler();
        let first = sleepy("Swap", 50);
        sched.schedule_job(&first, first.triggers(), true).await.unwrap();
        sched
            .schedule_job(&first, vec![Trigger::Interval(Duration::from_secs(60))], true)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sched.job_keys(), vec!["Test.Swap".to_string()]);
        assert!(sched.shutdown(Duration::from_secs(1)).await);
    }
}
