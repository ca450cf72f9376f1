// src/progress/store.rs

//! Shared progress store keyed by task instance key.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

/// Progress of one task instance.
///
/// Either half may be absent: a task can publish a message before its first
/// percentage, and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    pub percentage: Option<i32>,
    pub message: Option<String>,
}

/// Concurrent map from task instance key to [`ProgressRecord`].
///
/// Cloning yields another handle onto the same map, so one store is created
/// per process and handed to the scheduler, the tasks and any status reader.
/// Records are created on first write and removed by [`ProgressStore::clear_data`].
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    records: Arc<RwLock<HashMap<String, ProgressRecord>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the percentage for `key`. Values are not clamped.
    pub fn set_progress(&self, key: &str, percent: i32) {
        trace!(key, percent, "set progress");
        let mut records = self.write();
        records.entry(key.to_string()).or_default().percentage = Some(percent);
    }

    /// Set `floor(current / total * 100)`; a non-positive `total` yields 0.
    pub fn set_progress_ratio(&self, key: &str, current: i64, total: i64) {
        self.set_progress(key, ratio_percent(current, total));
    }

    /// Weighted multi-item progress: item `current` of `total` is
    /// `item_percent` done.
    ///
    /// Yields `floor((current * 100 + item_percent) / total)`, or 0 when
    /// `total <= 0`.
    pub fn set_progress_items(&self, key: &str, current: i64, total: i64, item_percent: i64) {
        self.set_progress(key, items_percent(current, total, item_percent));
    }

    pub fn get_progress(&self, key: &str) -> Option<i32> {
        self.read().get(key).and_then(|r| r.percentage)
    }

    pub fn set_message(&self, key: &str, text: impl Into<String>) {
        let text = text.into();
        trace!(key, message = %text, "set message");
        let mut records = self.write();
        records.entry(key.to_string()).or_default().message = Some(text);
    }

    pub fn get_message(&self, key: &str) -> Option<String> {
        self.read().get(key).and_then(|r| r.message.clone())
    }

    pub fn get_record(&self, key: &str) -> Option<ProgressRecord> {
        self.read().get(key).cloned()
    }

    /// Remove both percentage and message for `key`. No-op if absent.
    pub fn clear_data(&self, key: &str) {
        if self.write().remove(key).is_some() {
            trace!(key, "cleared progress data");
        }
    }

    /// All records, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, ProgressRecord)> {
        let mut all: Vec<_> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a record half-written, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ProgressRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ProgressRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn ratio_percent(current: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    (current.saturating_mul(100)).div_euclid(total) as i32
}

fn items_percent(current: i64, total: i64, item_percent: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    (current.saturating_mul(100).saturating_add(item_percent)).div_euclid(total) as i32
}
