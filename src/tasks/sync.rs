// src/tasks/sync.rs

//! Sync every configured cloud storage into the local library.
//!
//! Storages are processed one after another; each gets an equal slice of the
//! progress bar. A storage that fails is logged and skipped so the remaining
//! ones still sync.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::{Result, TaskError};
use crate::policy::{schedule_task, PolicyConfig, ScheduleOptions};
use crate::process::{ProcessCommand, ProcessHooks, ProcessRunner, ProcessSlot};
use crate::progress::{parse_percent, ProgressStore};
use crate::scheduler::JobScheduler;
use crate::task::{
    check_for_interrupt, job_key, JobContext, JobData, TaskDescriptor, TaskFuture, TaskUnit,
};
use crate::tasks::files::split_list;
use crate::tasks::TaskServices;

pub const JOB_TYPE: &str = "cloud.sync";
pub const CATEGORY: &str = "Cloud";
pub const NAME: &str = "Sync";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncParams {
    /// Storage names as configured in the sync tool.
    pub storages: Vec<String>,
    /// Path inside each storage.
    pub remote_path: String,
    /// Each storage lands in `<local_root>/<storage>`.
    pub local_root: PathBuf,
}

impl SyncParams {
    fn from_job_data(data: &JobData) -> Result<Self> {
        let storages = split_list(data.get_str("storages")?);
        if storages.is_empty() {
            return Err(TaskError::Argument(
                "sync job needs at least one storage".to_string(),
            ));
        }
        Ok(Self {
            storages,
            remote_path: data.get_str("remote_path")?.to_string(),
            local_root: PathBuf::from(data.get_str("local_root")?),
        })
    }
}

/// Outcome of one storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageResult {
    Synced,
    Skipped,
}

pub struct SyncTask {
    params: SyncParams,
    runner: Arc<dyn ProcessRunner>,
    program: String,
    process: ProcessSlot,
}

impl SyncTask {
    pub fn new(
        params: SyncParams,
        runner: Arc<dyn ProcessRunner>,
        program: impl Into<String>,
    ) -> Self {
        Self {
            params,
            runner,
            program: program.into(),
            process: ProcessSlot::new(),
        }
    }

    pub fn from_job_data(data: &JobData, services: &TaskServices) -> Result<Self> {
        Ok(Self::new(
            SyncParams::from_job_data(data)?,
            Arc::clone(&services.runner),
            services.sync_program.clone(),
        ))
    }

    pub fn descriptor(params: &SyncParams) -> Result<TaskDescriptor> {
        TaskDescriptor::builder(CATEGORY, NAME, JOB_TYPE)
            .title("Sync cloud storages")
            .description(format!(
                "Sync {} into {}",
                params.storages.join(", "),
                params.local_root.display()
            ))
            .recovery(true)
            .disallow_concurrent(true)
            .data("storages", params.storages.join(","))
            .data("remote_path", params.remote_path.as_str())
            .data("local_root", params.local_root.to_string_lossy().into_owned())
            .build()
    }

    pub async fn schedule(
        scheduler: &dyn JobScheduler,
        params: &SyncParams,
        options: ScheduleOptions,
        config: &PolicyConfig,
    ) -> Result<String> {
        let descriptor = Self::descriptor(params)?;
        schedule_task(scheduler, &descriptor, options, config).await
    }

    async fn sync_storage(
        &self,
        ctx: &JobContext,
        key: &str,
        progress: &ProgressStore,
        index: usize,
    ) -> Result<()> {
        let storage = &self.params.storages[index];
        let total = self.params.storages.len() as i64;
        let target = self.params.local_root.join(storage);

        let command = ProcessCommand::new(&self.program)
            .arg("sync")
            .arg(format!("{storage}:{}", self.params.remote_path))
            .arg(target.to_string_lossy())
            .arg("--progress");

        progress.set_message(key, format!("Syncing {storage} ({}/{total})", index + 1));
        let hooks = ProcessHooks::new()
            .on_started(|handle| self.process.attach(handle))
            .on_stdout_line(|line| {
                if let Some(pct) = parse_percent(line) {
                    progress.set_progress_items(key, index as i64, total, i64::from(pct));
                }
            });

        let result = self
            .runner
            .run(command, hooks, Some(ctx.cancellation()))
            .await;
        self.process.detach();

        result?.ensure_success(&format!("sync of storage '{storage}'"))?;
        Ok(())
    }
}

impl TaskUnit for SyncTask {
    fn execute_task<'a>(
        &'a self,
        ctx: &'a JobContext,
        progress: &'a ProgressStore,
    ) -> TaskFuture<'a> {
        Box::pin(async move {
            let key = job_key(ctx)?.to_string();
            let total = self.params.storages.len();
            info!(key = %key, storages = total, "sync started");

            let mut results = Vec::with_capacity(total);
            for (index, storage) in self.params.storages.iter().enumerate() {
                check_for_interrupt(ctx)?;
                match self.sync_storage(ctx, &key, progress, index).await {
                    Ok(()) => {
                        info!(key = %key, storage = %storage, "storage synced");
                        results.push(StorageResult::Synced);
                    }
                    Err(e) if e.is_cancellation() => return Err(e),
                    Err(e) => {
                        error!(
                            key = %key,
                            storage = %storage,
                            error = %e,
                            "storage sync failed; skipping"
                        );
                        results.push(StorageResult::Skipped);
                    }
                }
                progress.set_progress_items(&key, index as i64 + 1, total as i64, 0);
            }

            let skipped = results.iter().filter(|r| **r == StorageResult::Skipped).count();
            if skipped > 0 {
                warn!(key = %key, skipped, total, "sync finished with skipped storages");
            } else {
                info!(key = %key, total, "sync finished");
            }
            progress.set_message(&key, format!("Synced {} of {total} storages", total - skipped));
            Ok(())
        })
    }

    fn kill(&self) -> Result<()> {
        self.process.kill_attached(&format!("{CATEGORY}.{NAME}"));
        Ok(())
    }
}
