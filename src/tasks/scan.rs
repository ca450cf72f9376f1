// src/tasks/scan.rs

//! Walk the library, fingerprint every book file and hand it to a
//! [`ScanHandler`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::policy::{schedule_task, PolicyConfig, ScheduleOptions};
use crate::progress::ProgressStore;
use crate::scheduler::JobScheduler;
use crate::task::{
    check_for_interrupt, job_key, JobContext, JobData, TaskDescriptor, TaskFuture, TaskUnit,
};
use crate::tasks::files::{
    collect_matching_files_async, compute_file_hash, relative_str, split_list, FilePatterns,
};
use crate::tasks::TaskServices;

pub const JOB_TYPE: &str = "library.scan";
pub const CATEGORY: &str = "Library";
pub const NAME: &str = "Scan";

/// One fingerprinted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Relative to the scan root, forward slashes.
    pub relative: String,
    pub size: u64,
    /// blake3, hex encoded.
    pub hash: String,
}

/// Business callback invoked for each scanned file.
pub trait ScanHandler: Send + Sync {
    fn on_file(&self, file: &ScannedFile) -> anyhow::Result<()>;
}

/// Default handler: logs what it sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingScanHandler;

impl ScanHandler for LoggingScanHandler {
    fn on_file(&self, file: &ScannedFile) -> anyhow::Result<()> {
        info!(path = %file.relative, size = file.size, hash = %file.hash, "scanned file");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanParams {
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
}

impl ScanParams {
    fn from_job_data(data: &JobData) -> Result<Self> {
        let exclude = match data.get("exclude") {
            Some(_) => split_list(data.get_str("exclude")?),
            None => Vec::new(),
        };
        Ok(Self {
            root: PathBuf::from(data.get_str("root")?),
            patterns: split_list(data.get_str("patterns")?),
            exclude,
        })
    }
}

pub struct ScanTask {
    params: ScanParams,
    handler: Arc<dyn ScanHandler>,
}

impl ScanTask {
    pub fn new(params: ScanParams, handler: Arc<dyn ScanHandler>) -> Self {
        Self { params, handler }
    }

    pub fn from_job_data(data: &JobData, services: &TaskServices) -> Result<Self> {
        Ok(Self::new(
            ScanParams::from_job_data(data)?,
            Arc::clone(&services.scan_handler),
        ))
    }

    pub fn descriptor(params: &ScanParams) -> Result<TaskDescriptor> {
        let mut builder = TaskDescriptor::builder(CATEGORY, NAME, JOB_TYPE)
            .title("Scan library")
            .description(format!("Fingerprint book files under {}", params.root.display()))
            .disallow_concurrent(true)
            .data("root", params.root.to_string_lossy().into_owned())
            .data("patterns", params.patterns.join(","));
        if !params.exclude.is_empty() {
            builder = builder.data("exclude", params.exclude.join(","));
        }
        builder.build()
    }

    pub async fn schedule(
        scheduler: &dyn JobScheduler,
        params: &ScanParams,
        options: ScheduleOptions,
        config: &PolicyConfig,
    ) -> Result<String> {
        let descriptor = Self::descriptor(params)?;
        schedule_task(scheduler, &descriptor, options, config).await
    }

    async fn scan_one(&self, path: PathBuf) -> anyhow::Result<ScannedFile> {
        let relative = relative_str(&self.params.root, &path)
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let (size, hash) = tokio::task::spawn_blocking({
            let path = path.clone();
            move || -> anyhow::Result<(u64, String)> {
                let size = std::fs::metadata(&path)
                    .with_context(|| format!("reading metadata of {:?}", path))?
                    .len();
                Ok((size, compute_file_hash(&path)?))
            }
        })
        .await
        .context("hashing task panicked")??;

        let file = ScannedFile {
            path,
            relative,
            size,
            hash,
        };
        self.handler
            .on_file(&file)
            .with_context(|| format!("handling {}", file.relative))?;
        Ok(file)
    }
}

impl TaskUnit for ScanTask {
    fn execute_task<'a>(
        &'a self,
        ctx: &'a JobContext,
        progress: &'a ProgressStore,
    ) -> TaskFuture<'a> {
        Box::pin(async move {
            let key = job_key(ctx)?.to_string();
            let patterns = FilePatterns::new(&self.params.patterns, &self.params.exclude)?;
            progress.set_message(&key, format!("Listing {}", self.params.root.display()));

            let files = collect_matching_files_async(self.params.root.clone(), patterns).await?;
            let total = files.len() as i64;
            info!(key = %key, root = ?self.params.root, files = total, "scan started");

            let mut scanned = 0usize;
            let mut failed = 0usize;
            for (i, path) in files.into_iter().enumerate() {
                check_for_interrupt(ctx)?;
                match self.scan_one(path).await {
                    Ok(file) => {
                        debug!(key = %key, path = %file.relative, "file scanned");
                        scanned += 1;
                    }
                    Err(e) => {
                        warn!(
                            key = %key,
                            error = %format!("{e:#}"),
                            "could not scan file; skipping"
                        );
                        failed += 1;
                    }
                }
                progress.set_progress_ratio(&key, i as i64 + 1, total);
            }

            let summary = if failed == 0 {
                format!("Scanned {scanned} files")
            } else {
                format!("Scanned {scanned} files, {failed} failed")
            };
            info!(key = %key, scanned, failed, "scan finished");
            progress.set_message(&key, summary);
            Ok(())
        })
    }
}
