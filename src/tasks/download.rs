// src/tasks/download.rs

//! Download one book's files from cloud storage.
//!
//! Two phases share the progress bar:
//! - 0-20%: remove stale files from the local target directory;
//! - 20-100%: run the sync tool's `copy`, remapping its `NN%` output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::Result;
use crate::policy::{schedule_task, PolicyConfig, ScheduleOptions};
use crate::process::{ProcessCommand, ProcessHooks, ProcessRunner, ProcessSlot};
use crate::progress::{parse_percent, remap_percent, ProgressStore};
use crate::scheduler::JobScheduler;
use crate::task::{
    check_for_interrupt, job_key, JobContext, JobData, TaskDescriptor, TaskFuture, TaskUnit,
};
use crate::tasks::files::{collect_matching_files_async, FilePatterns};
use crate::tasks::TaskServices;

pub const JOB_TYPE: &str = "cloud.download";
pub const CATEGORY: &str = "Cloud";

const CLEANUP_SPAN: i32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadParams {
    pub book_id: i64,
    /// Remote path in the sync tool's `storage:path` syntax.
    pub remote: String,
    pub local_dir: PathBuf,
}

impl DownloadParams {
    fn from_job_data(data: &JobData) -> Result<Self> {
        Ok(Self {
            book_id: data.get_int("book_id")?,
            remote: data.get_str("remote")?.to_string(),
            local_dir: PathBuf::from(data.get_str("local_dir")?),
        })
    }
}

pub struct DownloadTask {
    params: DownloadParams,
    runner: Arc<dyn ProcessRunner>,
    program: String,
    process: ProcessSlot,
}

impl DownloadTask {
    pub fn new(
        params: DownloadParams,
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
            DownloadParams::from_job_data(data)?,
            Arc::clone(&services.runner),
            services.sync_program.clone(),
        ))
    }

    /// Recoverable, single-flight descriptor keyed `Cloud.Download-<book_id>`.
    pub fn descriptor(params: &DownloadParams) -> Result<TaskDescriptor> {
        TaskDescriptor::builder(CATEGORY, format!("Download-{}", params.book_id), JOB_TYPE)
            .title(format!("Download book {}", params.book_id))
            .description(format!(
                "Copy {} into {}",
                params.remote,
                params.local_dir.display()
            ))
            .recovery(true)
            .disallow_concurrent(true)
            .data("book_id", params.book_id)
            .data("remote", params.remote.as_str())
            .data("local_dir", params.local_dir.to_string_lossy().into_owned())
            .build()
    }

    pub async fn schedule(
        scheduler: &dyn JobScheduler,
        params: &DownloadParams,
        options: ScheduleOptions,
        config: &PolicyConfig,
    ) -> Result<String> {
        let descriptor = Self::descriptor(params)?;
        schedule_task(scheduler, &descriptor, options, config).await
    }

    async fn remove_stale_files(
        &self,
        ctx: &JobContext,
        key: &str,
        progress: &ProgressStore,
    ) -> Result<()> {
        let dir = &self.params.local_dir;
        if !tokio::fs::try_exists(dir).await? {
            tokio::fs::create_dir_all(dir).await?;
            progress.set_progress(key, CLEANUP_SPAN);
            return Ok(());
        }

        progress.set_message(key, format!("Cleaning {}", dir.display()));
        let patterns = FilePatterns::new(&["**/*".to_string()], &[])?;
        let stale = collect_matching_files_async(dir.clone(), patterns).await?;
        let total = stale.len() as i64;

        for (i, path) in stale.iter().enumerate() {
            check_for_interrupt(ctx)?;
            remove_one(path).await;
            let pct = ((i as i64 + 1) * 100 / total.max(1)) as i32;
            progress.set_progress(key, remap_percent(pct, 0, CLEANUP_SPAN));
        }

        progress.set_progress(key, CLEANUP_SPAN);
        Ok(())
    }

    async fn copy_from_remote(
        &self,
        ctx: &JobContext,
        key: &str,
        progress: &ProgressStore,
    ) -> Result<()> {
        let command = ProcessCommand::new(&self.program)
            .arg("copy")
            .arg(&self.params.remote)
            .arg(self.params.local_dir.to_string_lossy())
            .arg("--progress");

        progress.set_message(key, format!("Downloading {}", self.params.remote));
        let hooks = ProcessHooks::new()
            .on_started(|handle| self.process.attach(handle))
            .on_stdout_line(|line| {
                if let Some(pct) = parse_percent(line) {
                    let mapped = remap_percent(pct, CLEANUP_SPAN, 100 - CLEANUP_SPAN);
                    progress.set_progress(key, mapped);
                }
            });

        let result = self
            .runner
            .run(command, hooks, Some(ctx.cancellation()))
            .await;
        self.process.detach();

        result?.ensure_success("download")?;
        Ok(())
    }
}

async fn remove_one(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = ?path, error = %e, "could not remove stale file; continuing");
    }
}

impl TaskUnit for DownloadTask {
    fn execute_task<'a>(
        &'a self,
        ctx: &'a JobContext,
        progress: &'a ProgressStore,
    ) -> TaskFuture<'a> {
        Box::pin(async move {
            let key = job_key(ctx)?.to_string();
            info!(
                key = %key,
                book_id = self.params.book_id,
                remote = %self.params.remote,
                "download started"
            );

            self.remove_stale_files(ctx, &key, progress).await?;
            check_for_interrupt(ctx)?;
            self.copy_from_remote(ctx, &key, progress).await?;

            info!(key = %key, book_id = self.params.book_id, "download finished");
            Ok(())
        })
    }

    fn kill(&self) -> Result<()> {
        self.process
            .kill_attached(&format!("{CATEGORY}.Download-{}", self.params.book_id));
        Ok(())
    }
}
