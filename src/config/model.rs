// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::policy::{PolicyConfig, ScheduleOptions};
use crate::tasks::download::DownloadParams;
use crate::tasks::remove::RemoveParams;
use crate::tasks::scan::ScanParams;
use crate::tasks::sync::SyncParams;

/// Configuration exactly as written in `Shelfjobs.toml`.
///
/// ```toml
/// [policy]
/// interrupt_timeout_secs = 30
///
/// [tools]
/// sync_program = "rclone"
///
/// [job.nightly-sync]
/// kind = "sync"
/// storages = ["gdrive", "dropbox"]
/// remote_path = "books"
/// local_root = "/srv/library"
/// ```
///
/// All sections are optional; see [`ConfigFile`] for the validated form.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub tools: ToolsSection,

    /// All jobs from `[job.<name>]`, keyed by name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// `[policy]` section: timeouts of the scheduling policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    #[serde(default = "default_interrupt_timeout_secs")]
    pub interrupt_timeout_secs: u64,

    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_interrupt_timeout_secs() -> u64 {
    30
}

fn default_wait_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            interrupt_timeout_secs: default_interrupt_timeout_secs(),
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// `[tools]` section: external programs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    /// rclone-compatible sync tool used by download and sync jobs.
    #[serde(default = "default_sync_program")]
    pub sync_program: String,
}

fn default_sync_program() -> String {
    "rclone".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sync_program: default_sync_program(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Download,
    Sync,
    Scan,
    Remove,
}

/// `[job.<name>]` section.
///
/// One flat table for every kind; which fields are required depends on
/// `kind` and is checked during validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub kind: JobKind,

    /// Block until the job finishes (bounded by `wait_timeout_secs`).
    #[serde(default)]
    pub wait_for_finish: bool,

    /// Interrupt a running instance of the same key first.
    #[serde(default)]
    pub stop_if_running: bool,

    // download
    #[serde(default)]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub local_dir: Option<PathBuf>,

    // sync
    #[serde(default)]
    pub storages: Vec<String>,
    #[serde(default)]
    pub remote_path: Option<String>,
    #[serde(default)]
    pub local_root: Option<PathBuf>,

    // scan + remove
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// What a validated job will schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Download(DownloadParams),
    Sync(SyncParams),
    Scan(ScanParams),
    Remove(RemoveParams),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub request: JobRequest,
    pub options: ScheduleOptions,
}

/// Validated configuration.
///
/// Built only through `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub policy: PolicyConfig,
    pub tools: ToolsSection,
    pub job: BTreeMap<String, JobEntry>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        policy: PolicyConfig,
        tools: ToolsSection,
        job: BTreeMap<String, JobEntry>,
    ) -> Self {
        Self { policy, tools, job }
    }
}
