// tests/scheduling_policy.rs

use std::sync::Arc;
use std::time::Duration;

use shelfjobs::listener::CompletionListener;
use shelfjobs::policy::{
    interrupt_and_wait, post_schedule_steps, pre_schedule_steps, schedule_task, ScheduleOptions,
};
use shelfjobs::progress::ProgressStore;
use shelfjobs::scheduler::{JobRegistry, JobScheduler, LocalScheduler, Trigger};
use shelfjobs::task::TaskDescriptor;
use shelfjobs_test_utils::builders::fast_policy;
use shelfjobs_test_utils::fake_task::{register_controlled, Behaviour};
use shelfjobs_test_utils::{init_tracing, with_timeout};

fn descriptor(name: &str, job_type: &str) -> TaskDescriptor {
    TaskDescriptor::builder("Test", name, job_type).build().unwrap()
}

async fn wait_until_executing(scheduler: &LocalScheduler, key: &str) {
    with_timeout(async {
        while !scheduler.is_executing(key) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn wait_for_finish_reports_success_and_failure() {
    init_tracing();
    let mut registry = JobRegistry::new();
    register_controlled(&mut registry, "ok", Behaviour::Succeed, false);
    register_controlled(&mut registry, "fail", Behaviour::FailExplicitly, false);
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let policy = fast_policy();

    for (name, job_type, expected) in [("Ok", "ok", Some(true)), ("Fail", "fail", Some(false))] {
        let desc = descriptor(name, job_type);
        let pending = pre_schedule_steps(&scheduler, &desc, ScheduleOptions::wait(), &policy).await;
        assert!(pending.is_waiting());
        scheduler
            .schedule_job(&desc, desc.triggers(), true)
            .await
            .unwrap();
        let outcome = with_timeout(post_schedule_steps(&scheduler, pending, &policy)).await;
        assert_eq!(outcome, expected, "job {name}");
    }

    // Explicit failure leaves the progress record behind; success clears it.
    let progress = scheduler.progress();
    assert_eq!(progress.get_progress("Test.Fail"), Some(0));
    assert!(progress.get_record("Test.Ok").is_none());
}

#[tokio::test]
async fn unexpected_errors_look_like_success_to_listeners() {
    init_tracing();
    let mut registry = JobRegistry::new();
    register_controlled(&mut registry, "crash", Behaviour::ErrorUnexpectedly, false);
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let desc = descriptor("Crash", "crash");

    let listener = Arc::new(CompletionListener::new(desc.key()));
    scheduler.add_listener(listener.clone());
    scheduler
        .schedule_job(&desc, vec![Trigger::Now], true)
        .await
        .unwrap();

    assert_eq!(listener.wait(Duration::from_secs(5)).await, Some(true));
    assert_eq!(scheduler.progress().get_progress("Test.Crash"), Some(10));
}

#[tokio::test]
async fn stop_if_running_interrupts_cooperative_instance() {
    init_tracing();
    let mut registry = JobRegistry::new();
    let counters =
        register_controlled(&mut registry, "loop", Behaviour::RunUntilInterrupted, false);
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let policy = fast_policy();
    let desc = descriptor("Loop", "loop");

    schedule_task(&scheduler, &desc, ScheduleOptions::default(), &policy)
        .await
        .unwrap();
    wait_until_executing(&scheduler, "Test.Loop").await;

    schedule_task(&scheduler, &desc, ScheduleOptions::replace(), &policy)
        .await
        .unwrap();

    assert_eq!(counters.finished(), 1);
    assert_eq!(counters.kill_calls(), 0);
    wait_until_executing(&scheduler, "Test.Loop").await;
    assert_eq!(counters.started(), 2);

    assert!(scheduler.shutdown(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn stop_if_running_kills_instance_that_ignores_interrupts() {
    init_tracing();
    let mut registry = JobRegistry::new();
    let counters = register_controlled(
        &mut registry,
        "stubborn",
        Behaviour::IgnoreInterrupts(Duration::from_secs(30)),
        true,
    );
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let policy = fast_policy();

    let desc = descriptor("Stubborn", "stubborn");
    scheduler
        .schedule_job(&desc, desc.triggers(), true)
        .await
        .unwrap();
    wait_until_executing(&scheduler, "Test.Stubborn").await;

    with_timeout(interrupt_and_wait(
        &scheduler,
        "Test.Stubborn",
        policy.interrupt_timeout,
        policy.poll_interval,
    ))
    .await;

    assert_eq!(counters.kill_calls(), 1);
    // The kill lands asynchronously; the instance is gone shortly after.
    assert!(with_timeout(scheduler.wait_idle(Duration::from_secs(2))).await);
    assert_eq!(counters.finished(), 1);
}

#[tokio::test]
async fn stop_if_running_proceeds_when_instance_cannot_be_stopped() {
    init_tracing();
    let mut registry = JobRegistry::new();
    let counters = register_controlled(
        &mut registry,
        "immortal",
        Behaviour::IgnoreInterrupts(Duration::from_secs(30)),
        false,
    );
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let policy = fast_policy();
    let desc = descriptor("Immortal", "immortal");

    scheduler
        .schedule_job(&desc, desc.triggers(), true)
        .await
        .unwrap();
    wait_until_executing(&scheduler, "Test.Immortal").await;

    let key = with_timeout(schedule_task(&scheduler, &desc, ScheduleOptions::replace(), &policy))
        .await
        .unwrap();
    assert_eq!(key, "Test.Immortal");
    assert_eq!(counters.kill_calls(), 1);

    // The new firing is not single-flight, so it starts next to the old one.
    with_timeout(async {
        while counters.started() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(counters.finished(), 0);
    assert_eq!(
        scheduler
            .currently_executing()
            .iter()
            .filter(|j| j.key == "Test.Immortal")
            .count(),
        2
    );
}

#[tokio::test]
async fn single_flight_jobs_queue_behind_the_running_instance() {
    init_tracing();
    let mut registry = JobRegistry::new();
    let counters = register_controlled(
        &mut registry,
        "slow",
        Behaviour::IgnoreInterrupts(Duration::from_millis(150)),
        false,
    );
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let desc = TaskDescriptor::builder("Test", "Slow", "slow")
        .disallow_concurrent(true)
        .build()
        .unwrap();

    scheduler
        .schedule_job(&desc, desc.triggers(), true)
        .await
        .unwrap();
    wait_until_executing(&scheduler, "Test.Slow").await;
    scheduler
        .schedule_job(&desc, desc.triggers(), true)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counters.started(), 1);
    assert_eq!(scheduler.currently_executing().len(), 1);

    assert!(with_timeout(scheduler.wait_idle(Duration::from_secs(3))).await);
    assert_eq!(counters.started(), 2);
    assert_eq!(counters.finished(), 2);
}

#[tokio::test]
async fn wait_times_out_for_long_jobs() {
    init_tracing();
    let mut registry = JobRegistry::new();
    register_controlled(
        &mut registry,
        "long",
        Behaviour::IgnoreInterrupts(Duration::from_secs(30)),
        true,
    );
    let scheduler = LocalScheduler::new(registry, ProgressStore::new());
    let mut policy = fast_policy();
    policy.wait_timeout = Duration::from_millis(100);
    let desc = descriptor("Long", "long");

    let pending = pre_schedule_steps(&scheduler, &desc, ScheduleOptions::wait(), &policy).await;
    scheduler
        .schedule_job(&desc, desc.triggers(), true)
        .await
        .unwrap();

    assert_eq!(
        with_timeout(post_schedule_steps(&scheduler, pending, &policy)).await,
        None
    );
    assert!(scheduler.is_executing("Test.Long"));
}
