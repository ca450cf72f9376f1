// src/tasks/mod.rs

//! Concrete background tasks.
//!
//! - [`download`]: fetch one book's files from cloud storage.
//! - [`sync`]: sync several cloud storages into the local library.
//! - [`scan`]: walk the library and fingerprint book files.
//! - [`remove`]: bulk-delete files matching a pattern.
//!
//! Each task is rebuilt from scalar [`JobData`](crate::task::JobData) by a
//! factory registered in [`register_all`]; the services it needs are captured
//! by that factory.

use std::sync::Arc;

use crate::policy::PolicyConfig;
use crate::process::{ProcessRunner, ProcessSupervisor};
use crate::scheduler::JobRegistry;
use crate::task::TaskUnit;

pub mod download;
pub mod files;
pub mod remove;
pub mod scan;
pub mod sync;

pub use download::DownloadTask;
pub use remove::RemoveTask;
pub use scan::{LoggingScanHandler, ScanHandler, ScanTask, ScannedFile};
pub use sync::SyncTask;

/// Services shared by the concrete tasks.
#[derive(Clone)]
pub struct TaskServices {
    /// Launches the external sync tool.
    pub runner: Arc<dyn ProcessRunner>,
    /// Program name or path of the rclone-like sync tool.
    pub sync_program: String,
    /// Receives every file a scan fingerprints.
    pub scan_handler: Arc<dyn ScanHandler>,
    pub policy: PolicyConfig,
}

impl TaskServices {
    pub fn new(sync_program: impl Into<String>) -> Self {
        Self {
            runner: Arc::new(ProcessSupervisor),
            sync_program: sync_program.into(),
            scan_handler: Arc::new(LoggingScanHandler),
            policy: PolicyConfig::default(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_scan_handler(mut self, handler: Arc<dyn ScanHandler>) -> Self {
        self.scan_handler = handler;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }
}

/// Register a factory for every concrete task type.
pub fn register_all(registry: &mut JobRegistry, services: &TaskServices) {
    {
        let services = services.clone();
        registry.register(download::JOB_TYPE, move |data| {
            Ok(Arc::new(DownloadTask::from_job_data(data, &services)?) as Arc<dyn TaskUnit>)
        });
    }
    {
        let services = services.clone();
        registry.register(sync::JOB_TYPE, move |data| {
            Ok(Arc::new(SyncTask::from_job_data(data, &services)?) as Arc<dyn TaskUnit>)
        });
    }
    {
        let services = services.clone();
        registry.register(scan::JOB_TYPE, move |data| {
            Ok(Arc::new(ScanTask::from_job_data(data, &services)?) as Arc<dyn TaskUnit>)
        });
    }
    registry.register(remove::JOB_TYPE, move |data| {
        Ok(Arc::new(RemoveTask::from_job_data(data)?) as Arc<dyn TaskUnit>)
    });
}
