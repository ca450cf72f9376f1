// src/scheduler/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::scheduler::SchedulerError;
use crate::task::{JobData, TaskUnit};

/// Builds a fresh task instance from scalar job data.
///
/// Services a task needs (process runner, scan handler, ...) are captured by
/// the factory when it is registered; only `JobData` travels with the job.
pub type JobFactory = Arc<dyn Fn(&JobData) -> Result<Arc<dyn TaskUnit>> + Send + Sync>;

/// Job type name → factory.
#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: HashMap<String, JobFactory>,
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("JobRegistry").field("job_types", &names).finish()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, job_type: impl Into<String>, factory: F)
    where
        F: Fn(&JobData) -> Result<Arc<dyn TaskUnit>> + Send + Sync + 'static,
    {
        self.factories.insert(job_type.into(), Arc::new(factory));
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }

    pub fn build(&self, job_type: &str, data: &JobData) -> Result<Arc<dyn TaskUnit>> {
        let factory = self
            .factories
            .get(job_type)
            .ok_or_else(|| SchedulerError::UnknownJobType(job_type.to_string()))?;
        factory(data)
    }
}
