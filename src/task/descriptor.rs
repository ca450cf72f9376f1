// src/task/descriptor.rs

//! Static metadata used to build a schedulable job.

use std::time::Duration;

use crate::errors::{Result, TaskError};
use crate::scheduler::Trigger;
use crate::task::{JobData, JobValue, TaskInstanceKey};

/// Immutable description of a job handed to the scheduler.
///
/// `job_type` names the registry factory that rebuilds the task from `data`,
/// which is all that survives a restart for recoverable jobs.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    key: TaskInstanceKey,
    job_type: String,
    title: String,
    description: String,
    recovery: bool,
    start_now: bool,
    cron: Option<String>,
    interval: Option<Duration>,
    disallow_concurrent: bool,
    data: JobData,
}

impl TaskDescriptor {
    pub fn builder(
        category: impl Into<String>,
        name: impl Into<String>,
        job_type: impl Into<String>,
    ) -> TaskDescriptorBuilder {
        TaskDescriptorBuilder {
            category: category.into(),
            name: name.into(),
            job_type: job_type.into(),
            title: None,
            description: String::new(),
            recovery: false,
            start_now: true,
            cron: None,
            interval: None,
            disallow_concurrent: false,
            data: JobData::new(),
        }
    }

    pub fn key(&self) -> &TaskInstanceKey {
        &self.key
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn recovery(&self) -> bool {
        self.recovery
    }

    pub fn start_now(&self) -> bool {
        self.start_now
    }

    pub fn cron(&self) -> Option<&str> {
        self.cron.as_deref()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn disallow_concurrent(&self) -> bool {
        self.disallow_concurrent
    }

    pub fn data(&self) -> &JobData {
        &self.data
    }

    /// Triggers implied by the descriptor, in firing order.
    pub fn triggers(&self) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        if self.start_now {
            triggers.push(Trigger::Now);
        }
        if let Some(every) = self.interval {
            triggers.push(Trigger::Interval(every));
        }
        if let Some(ref expr) = self.cron {
            triggers.push(Trigger::Cron(expr.clone()));
        }
        triggers
    }
}

pub struct TaskDescriptorBuilder {
    category: String,
    name: String,
    job_type: String,
    title: Option<String>,
    description: String,
    recovery: bool,
    start_now: bool,
    cron: Option<String>,
    interval: Option<Duration>,
    disallow_concurrent: bool,
    data: JobData,
}

impl TaskDescriptorBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn recovery(mut self, val: bool) -> Self {
        self.recovery = val;
        self
    }

    pub fn start_now(mut self, val: bool) -> Self {
        self.start_now = val;
        self
    }

    pub fn cron(mut self, expr: impl Into<String>) -> Self {
        self.cron = Some(expr.into());
        self
    }

    pub fn interval(mut self, every: Duration) -> Self {
        self.interval = Some(every);
        self
    }

    pub fn disallow_concurrent(mut self, val: bool) -> Self {
        self.disallow_concurrent = val;
        self
    }

    pub fn data(mut self, name: &str, value: impl Into<JobValue>) -> Self {
        self.data.insert(name, value);
        self
    }

    pub fn build(self) -> Result<TaskDescriptor> {
        let key = TaskInstanceKey::new(self.category, self.name)?;
        if self.job_type.trim().is_empty() {
            return Err(TaskError::Argument(format!(
                "descriptor for '{key}' has an empty job type"
            )));
        }
        if self.interval.is_some_and(|d| d.is_zero()) {
            return Err(TaskError::Argument(format!(
                "descriptor for '{key}' has a zero interval"
            )));
        }
        let title = self.title.unwrap_or_else(|| key.to_string());

        Ok(TaskDescriptor {
            key,
            job_type: self.job_type,
            title,
            description: self.description,
            recovery: self.recovery,
            start_now: self.start_now,
            cron: self.cron,
            interval: self.interval,
            disallow_concurrent: self.disallow_concurrent,
            data: self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_triggers_in_order() {
        let desc = TaskDescriptor::builder("Cloud", "Sync", "sync")
            .interval(Duration::from_secs(3600))
            .cron("0 0 3 * * ?")
            .build()
            .unwrap();

        assert_eq!(desc.title(), "Cloud.Sync");
        assert_eq!(
            desc.triggers(),
            vec![
                Trigger::Now,
                Trigger::Interval(Duration::from_secs(3600)),
                Trigger::Cron("0 0 3 * * ?".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_empty_job_type_and_zero_interval() {
        assert!(TaskDescriptor::builder("Cloud", "Sync", " ").build().is_err());
        assert!(
            TaskDescriptor::builder("Cloud", "Sync", "sync")
                .interval(Duration::ZERO)
                .build()
                .is_err()
        );
    }
}
