// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{
    ConfigFile, JobConfig, JobEntry, JobKind, JobRequest, PolicySection, RawConfigFile,
};
use crate::errors::{Result, TaskError};
use crate::policy::{PolicyConfig, ScheduleOptions};
use crate::tasks::download::DownloadParams;
use crate::tasks::files::FilePatterns;
use crate::tasks::remove::RemoveParams;
use crate::tasks::scan::ScanParams;
use crate::tasks::sync::SyncParams;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_jobs(&raw)?;
        let policy = validate_policy(&raw.policy)?;
        if raw.tools.sync_program.trim().is_empty() {
            return Err(TaskError::ConfigError(
                "[tools].sync_program must not be empty".to_string(),
            ));
        }

        let mut jobs = BTreeMap::new();
        for (name, job) in raw.job.iter() {
            jobs.insert(name.clone(), validate_job(name, job)?);
        }

        Ok(ConfigFile::new_unchecked(policy, raw.tools, jobs))
    }
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(TaskError::ConfigError(
            "config must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_policy(section: &PolicySection) -> Result<PolicyConfig> {
    for (field, value) in [
        ("interrupt_timeout_secs", section.interrupt_timeout_secs),
        ("wait_timeout_secs", section.wait_timeout_secs),
        ("poll_interval_ms", section.poll_interval_ms),
    ] {
        if value == 0 {
            return Err(TaskError::ConfigError(format!(
                "[policy].{field} must be >= 1 (got 0)"
            )));
        }
    }

    Ok(PolicyConfig {
        interrupt_timeout: Duration::from_secs(section.interrupt_timeout_secs),
        wait_timeout: Duration::from_secs(section.wait_timeout_secs),
        poll_interval: Duration::from_millis(section.poll_interval_ms),
    })
}

fn validate_job(name: &str, job: &JobConfig) -> Result<JobEntry> {
    if name.contains('.') {
        return Err(TaskError::ConfigError(format!(
            "job name '{name}' must not contain '.'"
        )));
    }

    let request = match job.kind {
        JobKind::Download => JobRequest::Download(DownloadParams {
            book_id: required(name, "book_id", job.book_id)?,
            remote: required(name, "remote", job.remote.clone())?,
            local_dir: required(name, "local_dir", job.local_dir.clone())?,
        }),
        JobKind::Sync => {
            if job.storages.is_empty() {
                return Err(missing(name, "storages"));
            }
            let bad = job
                .storages
                .iter()
                .find(|s| s.trim().is_empty() || s.contains(','));
            if let Some(bad) = bad {
                return Err(TaskError::ConfigError(format!(
                    "job '{name}' has an invalid storage name '{bad}'"
                )));
            }
            JobRequest::Sync(SyncParams {
                storages: job.storages.clone(),
                remote_path: job.remote_path.clone().unwrap_or_default(),
                local_root: required(name, "local_root", job.local_root.clone())?,
            })
        }
        JobKind::Scan => {
            check_patterns(name, &job.patterns, &job.exclude)?;
            JobRequest::Scan(ScanParams {
                root: required_root(name, job)?,
                patterns: job.patterns.clone(),
                exclude: job.exclude.clone(),
            })
        }
        JobKind::Remove => {
            check_patterns(name, &job.patterns, &[])?;
            JobRequest::Remove(RemoveParams {
                name: name.to_string(),
                root: required_root(name, job)?,
                patterns: job.patterns.clone(),
                dry_run: job.dry_run,
            })
        }
    };

    Ok(JobEntry {
        request,
        options: ScheduleOptions {
            wait_for_finish: job.wait_for_finish,
            stop_if_running: job.stop_if_running,
        },
    })
}

fn required<T>(job: &str, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| missing(job, field))
}

fn required_root(job: &str, cfg: &JobConfig) -> Result<PathBuf> {
    required(job, "root", cfg.root.clone())
}

fn missing(job: &str, field: &str) -> TaskError {
    TaskError::ConfigError(format!("job '{job}' is missing required field '{field}'"))
}

fn check_patterns(job: &str, include: &[String], exclude: &[String]) -> Result<()> {
    if include.is_empty() {
        return Err(missing(job, "patterns"));
    }
    // Job data carries the lists comma-joined.
    if let Some(bad) = include.iter().chain(exclude).find(|p| p.contains(',')) {
        return Err(TaskError::ConfigError(format!(
            "job '{job}' pattern '{bad}' must not contain ','"
        )));
    }
    FilePatterns::new(include, exclude)
        .map_err(|e| TaskError::ConfigError(format!("job '{job}': {e:#}")))?;
    Ok(())
}
