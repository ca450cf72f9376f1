#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use shelfjobs::config::{
    ConfigFile, JobConfig, JobKind, PolicySection, RawConfigFile, ToolsSection,
};
use shelfjobs::policy::PolicyConfig;

/// Policy timeouts short enough for tests.
pub fn fast_policy() -> PolicyConfig {
    PolicyConfig {
        interrupt_timeout: Duration::from_millis(300),
        wait_timeout: Duration::from_secs(3),
        poll_interval: Duration::from_millis(20),
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                policy: PolicySection::default(),
                tools: ToolsSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn with_sync_program(mut self, program: &str) -> Self {
        self.config.tools.sync_program = program.to_string();
        self
    }

    pub fn with_interrupt_timeout_secs(mut self, secs: u64) -> Self {
        self.config.policy.interrupt_timeout_secs = secs;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(kind: JobKind) -> Self {
        Self {
            job: JobConfig {
                kind,
                wait_for_finish: false,
                stop_if_running: false,
                book_id: None,
                remote: None,
                local_dir: None,
                storages: vec![],
                remote_path: None,
                local_root: None,
                root: None,
                patterns: vec![],
                exclude: vec![],
                dry_run: false,
            },
        }
    }

    pub fn download(book_id: i64, remote: &str, local_dir: impl AsRef<Path>) -> Self {
        let mut b = Self::new(JobKind::Download);
        b.job.book_id = Some(book_id);
        b.job.remote = Some(remote.to_string());
        b.job.local_dir = Some(local_dir.as_ref().to_path_buf());
        b
    }

    pub fn sync(storages: &[&str], local_root: impl AsRef<Path>) -> Self {
        let mut b = Self::new(JobKind::Sync);
        b.job.storages = storages.iter().map(|s| s.to_string()).collect();
        b.job.local_root = Some(local_root.as_ref().to_path_buf());
        b
    }

    pub fn scan(root: impl AsRef<Path>) -> Self {
        let mut b = Self::new(JobKind::Scan);
        b.job.root = Some(root.as_ref().to_path_buf());
        b
    }

    pub fn remove(root: impl AsRef<Path>) -> Self {
        let mut b = Self::new(JobKind::Remove);
        b.job.root = Some(root.as_ref().to_path_buf());
        b
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.job.patterns.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.job.exclude.push(pattern.to_string());
        self
    }

    pub fn remote_path(mut self, path: &str) -> Self {
        self.job.remote_path = Some(path.to_string());
        self
    }

    pub fn dry_run(mut self, val: bool) -> Self {
        self.job.dry_run = val;
        self
    }

    pub fn wait_for_finish(mut self, val: bool) -> Self {
        self.job.wait_for_finish = val;
        self
    }

    pub fn stop_if_running(mut self, val: bool) -> Self {
        self.job.stop_if_running = val;
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
