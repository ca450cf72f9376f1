// src/task/data.rs

//! Scalar job data attached to a descriptor.
//!
//! A recoverable task is rebuilt after a restart from this data alone, so
//! only integers, strings and booleans are representable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl From<i64> for JobValue {
    fn from(v: i64) -> Self {
        JobValue::Int(v)
    }
}

impl From<bool> for JobValue {
    fn from(v: bool) -> Self {
        JobValue::Bool(v)
    }
}

impl From<&str> for JobValue {
    fn from(v: &str) -> Self {
        JobValue::Str(v.to_string())
    }
}

impl From<String> for JobValue {
    fn from(v: String) -> Self {
        JobValue::Str(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobData {
    values: BTreeMap<String, JobValue>,
}

impl JobData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<JobValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<JobValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&JobValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(JobValue::Str(s)) => Ok(s),
            Some(other) => Err(wrong_type(name, "string", other)),
            None => Err(missing(name)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(JobValue::Int(v)) => Ok(*v),
            Some(other) => Err(wrong_type(name, "integer", other)),
            None => Err(missing(name)),
        }
    }

    /// Missing booleans read as `default`.
    pub fn get_bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.values.get(name) {
            Some(JobValue::Bool(v)) => Ok(*v),
            Some(other) => Err(wrong_type(name, "boolean", other)),
            None => Ok(default),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn missing(name: &str) -> TaskError {
    TaskError::Argument(format!("job data is missing '{name}'"))
}

fn wrong_type(name: &str, expected: &str, got: &JobValue) -> TaskError {
    TaskError::Argument(format!("job data '{name}' should be a {expected}, got {got:?}"))
}
