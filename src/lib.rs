// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod listener;
pub mod logging;
pub mod policy;
pub mod process;
pub mod progress;
pub mod scheduler;
pub mod task;
pub mod tasks;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, JobEntry, JobRequest};
use crate::policy::{PolicyConfig, ScheduleOptions};
use crate::progress::ProgressStore;
use crate::scheduler::{JobRegistry, JobScheduler, LocalScheduler};
use crate::tasks::{register_all, DownloadTask, RemoveTask, ScanTask, SyncTask, TaskServices};

/// How often the CLI prints a progress snapshot while jobs run.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// High-level entry point used by `main.rs`.
///
/// Loads the config, schedules the selected jobs on a [`LocalScheduler`],
/// prints progress until nothing is executing, and shuts down on Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let jobs = select_jobs(&cfg, args.job.as_deref(), args.stop_if_running)?;

    if args.dry_run {
        print_dry_run(&cfg, &jobs)?;
        return Ok(());
    }

    let services = TaskServices::new(cfg.tools.sync_program.clone()).with_policy(cfg.policy);
    let scheduler = local_scheduler(&services, ProgressStore::new());

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; shutting down");
            stop.cancel();
        });
    }

    for (name, entry) in &jobs {
        if stop.is_cancelled() {
            break;
        }
        let scheduled = tokio::select! {
            res = schedule_entry(&scheduler, entry, &cfg.policy) => Some(res),
            _ = stop.cancelled() => None,
        };
        match scheduled {
            Some(Ok(key)) => info!(job = %name, key = %key, "job scheduled"),
            Some(Err(e)) => error!(job = %name, error = %e, "failed to schedule job"),
            None => break,
        }
    }

    loop {
        tokio::select! {
            idle = scheduler.wait_idle(STATUS_INTERVAL) => {
                if idle {
                    break;
                }
                print_progress(scheduler.progress());
            }
            _ = stop.cancelled() => {
                scheduler.shutdown(cfg.policy.interrupt_timeout).await;
                break;
            }
        }
    }

    print_progress(scheduler.progress());
    debug!("all jobs finished");
    Ok(())
}

/// A [`LocalScheduler`] with every concrete task type registered.
pub fn local_scheduler(services: &TaskServices, progress: ProgressStore) -> LocalScheduler {
    let mut registry = JobRegistry::new();
    register_all(&mut registry, services);
    LocalScheduler::new(registry, progress)
}

/// Schedule one configured job through its task's `schedule` factory.
pub async fn schedule_entry(
    scheduler: &dyn JobScheduler,
    entry: &JobEntry,
    policy: &PolicyConfig,
) -> errors::Result<String> {
    match &entry.request {
        JobRequest::Download(p) => {
            DownloadTask::schedule(scheduler, p, entry.options, policy).await
        }
        JobRequest::Sync(p) => SyncTask::schedule(scheduler, p, entry.options, policy).await,
        JobRequest::Scan(p) => ScanTask::schedule(scheduler, p, entry.options, policy).await,
        JobRequest::Remove(p) => RemoveTask::schedule(scheduler, p, entry.options, policy).await,
    }
}

/// Jobs to run, in config order, with the CLI override applied.
fn select_jobs(
    cfg: &ConfigFile,
    only: Option<&str>,
    force_stop: bool,
) -> Result<Vec<(String, JobEntry)>> {
    let mut jobs: Vec<(String, JobEntry)> = match only {
        Some(name) => match cfg.job.get(name) {
            Some(entry) => vec![(name.to_string(), entry.clone())],
            None => bail!("no job named '{name}' in config"),
        },
        None => cfg
            .job
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect(),
    };

    if force_stop {
        for (_, entry) in jobs.iter_mut() {
            entry.options = ScheduleOptions {
                stop_if_running: true,
                ..entry.options
            };
        }
    }
    Ok(jobs)
}

fn job_key(request: &JobRequest) -> errors::Result<String> {
    let descriptor = match request {
        JobRequest::Download(p) => DownloadTask::descriptor(p)?,
        JobRequest::Sync(p) => SyncTask::descriptor(p)?,
        JobRequest::Scan(p) => ScanTask::descriptor(p)?,
        JobRequest::Remove(p) => RemoveTask::descriptor(p)?,
    };
    Ok(descriptor.key().to_string())
}

fn print_dry_run(cfg: &ConfigFile, jobs: &[(String, JobEntry)]) -> Result<()> {
    println!("shelfjobs dry-run");
    println!("  policy.interrupt_timeout = {:?}", cfg.policy.interrupt_timeout);
    println!("  policy.wait_timeout = {:?}", cfg.policy.wait_timeout);
    println!("  policy.poll_interval = {:?}", cfg.policy.poll_interval);
    println!("  tools.sync_program = {}", cfg.tools.sync_program);
    println!();

    println!("jobs ({}):", jobs.len());
    for (name, entry) in jobs {
        println!("  - {name}");
        println!("      key: {}", job_key(&entry.request)?);
        println!("      request: {:?}", entry.request);
        if entry.options.wait_for_finish {
            println!("      wait_for_finish: true");
        }
        if entry.options.stop_if_running {
            println!("      stop_if_running: true");
        }
    }

    debug!("dry-run complete (nothing scheduled)");
    Ok(())
}

fn print_progress(progress: &ProgressStore) {
    for (key, record) in progress.snapshot() {
        let pct = record
            .percentage
            .map(|p| format!("{p:>3}%"))
            .unwrap_or_else(|| "  -%".to_string());
        match record.message {
            Some(msg) => println!("{pct}  {key}  {msg}"),
            None => println!("{pct}  {key}"),
        }
    }
}
