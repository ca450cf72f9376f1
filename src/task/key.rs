// src/task/key.rs

use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, TaskError};

/// Identity of one schedulable unit, rendered as `"<Category>.<Name>"`.
///
/// The same string joins the scheduler's executing set, the progress store
/// and completion listeners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskInstanceKey {
    category: String,
    name: String,
}

impl TaskInstanceKey {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let category = category.into();
        let name = name.into();
        if category.trim().is_empty() {
            return Err(TaskError::Argument("task category must not be empty".to_string()));
        }
        if category.contains('.') {
            return Err(TaskError::Argument(format!(
                "task category '{category}' must not contain '.'"
            )));
        }
        if name.trim().is_empty() {
            return Err(TaskError::Argument("task name must not be empty".to_string()));
        }
        Ok(Self { category, name })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TaskInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.name)
    }
}

impl FromStr for TaskInstanceKey {
    type Err = TaskError;

    /// The first `.` separates category from name; the name may contain more dots.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((category, name)) => Self::new(category, name),
            None => Err(TaskError::Argument(format!(
                "task instance key '{s}' is not of the form <Category>.<Name>"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_parses() {
        let key = TaskInstanceKey::new("Cloud", "Download-42").unwrap();
        assert_eq!(key.to_string(), "Cloud.Download-42");

        let parsed: TaskInstanceKey = "Library.Remove-old.epub".parse().unwrap();
        assert_eq!(parsed.category(), "Library");
        assert_eq!(parsed.name(), "Remove-old.epub");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!("".parse::<TaskInstanceKey>(), Err(TaskError::Argument(_))));
        assert!(matches!("NoDot".parse::<TaskInstanceKey>(), Err(TaskError::Argument(_))));
        assert!(matches!(".Name".parse::<TaskInstanceKey>(), Err(TaskError::Argument(_))));
        assert!(matches!("Cat.".parse::<TaskInstanceKey>(), Err(TaskError::Argument(_))));
        assert!(TaskInstanceKey::new("A.B", "C").is_err());
    }
}
