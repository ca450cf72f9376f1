// src/tasks/remove.rs

//! Bulk-delete files under a root that match glob patterns.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::errors::{Result, TaskError};
use crate::policy::{schedule_task, PolicyConfig, ScheduleOptions};
use crate::progress::ProgressStore;
use crate::scheduler::JobScheduler;
use crate::task::{
    check_for_interrupt, job_key, JobContext, JobData, TaskDescriptor, TaskFuture, TaskUnit,
};
use crate::tasks::files::{collect_matching_files_async, relative_str, split_list, FilePatterns};

pub const JOB_TYPE: &str = "library.remove";
pub const CATEGORY: &str = "Library";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveParams {
    /// Distinguishes concurrent removals: the key is `Library.Remove-<name>`.
    pub name: String,
    pub root: PathBuf,
    pub patterns: Vec<String>,
    /// Only report what would be deleted.
    pub dry_run: bool,
}

impl RemoveParams {
    fn from_job_data(data: &JobData) -> Result<Self> {
        let patterns = split_list(data.get_str("patterns")?);
        if patterns.is_empty() {
            return Err(TaskError::Argument(
                "remove job needs at least one pattern".to_string(),
            ));
        }
        Ok(Self {
            name: data.get_str("name")?.to_string(),
            root: PathBuf::from(data.get_str("root")?),
            patterns,
            dry_run: data.get_bool_or("dry_run", false)?,
        })
    }
}

pub struct RemoveTask {
    params: RemoveParams,
}

impl RemoveTask {
    pub fn new(params: RemoveParams) -> Self {
        Self { params }
    }

    pub fn from_job_data(data: &JobData) -> Result<Self> {
        Ok(Self::new(RemoveParams::from_job_data(data)?))
    }

    pub fn descriptor(params: &RemoveParams) -> Result<TaskDescriptor> {
        TaskDescriptor::builder(CATEGORY, format!("Remove-{}", params.name), JOB_TYPE)
            .title(format!("Remove {}", params.name))
            .description(format!(
                "Delete {} under {}",
                params.patterns.join(", "),
                params.root.display()
            ))
            .data("name", params.name.as_str())
            .data("root", params.root.to_string_lossy().into_owned())
            .data("patterns", params.patterns.join(","))
            .data("dry_run", params.dry_run)
            .build()
    }

    pub async fn schedule(
        scheduler: &dyn JobScheduler,
        params: &RemoveParams,
        options: ScheduleOptions,
        config: &PolicyConfig,
    ) -> Result<String> {
        let descriptor = Self::descriptor(params)?;
        schedule_task(scheduler, &descriptor, options, config).await
    }
}

impl TaskUnit for RemoveTask {
    fn execute_task<'a>(
        &'a self,
        ctx: &'a JobContext,
        progress: &'a ProgressStore,
    ) -> TaskFuture<'a> {
        Box::pin(async move {
            let key = job_key(ctx)?.to_string();
            let root = &self.params.root;
            let patterns = FilePatterns::new(&self.params.patterns, &[])?;
            let files = collect_matching_files_async(root.clone(), patterns).await?;
            let total = files.len() as i64;
            info!(
                key = %key,
                root = ?root,
                files = total,
                dry_run = self.params.dry_run,
                "removal started"
            );

            let mut removed = 0usize;
            let mut failed = 0usize;
            for (i, path) in files.iter().enumerate() {
                check_for_interrupt(ctx)?;
                progress.set_progress_items(&key, i as i64, total, 0);
                let rel = relative_str(root, path)
                    .unwrap_or_else(|| path.to_string_lossy().into_owned());

                if self.params.dry_run {
                    info!(key = %key, path = %rel, "would remove");
                    removed += 1;
                } else {
                    match tokio::fs::remove_file(path).await {
                        Ok(()) => {
                            info!(key = %key, path = %rel, "removed");
                            removed += 1;
                        }
                        Err(e) => {
                            warn!(
                                key = %key,
                                path = %rel,
                                error = %e,
                                "could not remove file; skipping"
                            );
                            failed += 1;
                        }
                    }
                }
                progress.set_progress_items(&key, i as i64, total, 100);
            }

            let verb = if self.params.dry_run { "Would remove" } else { "Removed" };
            let summary = if failed == 0 {
                format!("{verb} {removed} files")
            } else {
                format!("{verb} {removed} files, {failed} failed")
            };
            info!(key = %key, removed, failed, "removal finished");
            progress.set_message(&key, summary);
            Ok(())
        })
    }
}
