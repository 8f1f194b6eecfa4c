//! Typed task meta.
//!
//! Tasks carry a small key/value map for worker-specific state. Keys are
//! enumerated so a typo is a compile error rather than a silently ignored
//! field.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recognised meta keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKey {
    /// Timestamp at which a worker started processing the task.
    InProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskMeta(BTreeMap<MetaKey, serde_json::Value>);

impl TaskMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: MetaKey) -> Option<&serde_json::Value> {
        self.0.get(&key)
    }

    pub fn insert(&mut self, key: MetaKey, value: serde_json::Value) {
        self.0.insert(key, value);
    }

    pub fn remove(&mut self, key: MetaKey) -> Option<serde_json::Value> {
        self.0.remove(&key)
    }

    /// When the in-progress flag was set, if it is set.
    ///
    /// A value that does not parse as a timestamp still counts as "set"; it is
    /// reported as the Unix epoch so the staleness check reclaims it.
    pub fn in_progress_since(&self) -> Option<DateTime<Utc>> {
        self.get(MetaKey::InProgress).map(|value| {
            serde_json::from_value(value.clone()).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        })
    }

    pub fn set_in_progress(&mut self, since: DateTime<Utc>) {
        // DateTime<Utc> always serializes to an RFC 3339 string.
        let value = serde_json::to_value(since).unwrap_or(serde_json::Value::Null);
        self.insert(MetaKey::InProgress, value);
    }

    pub fn clear_in_progress(&mut self) {
        self.remove(MetaKey::InProgress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn in_progress_flag_round_trips() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut meta = TaskMeta::new();
        assert!(meta.in_progress_since().is_none());

        meta.set_in_progress(since);
        assert_eq!(meta.in_progress_since(), Some(since));
        assert!(!meta.is_empty());

        meta.clear_in_progress();
        assert!(meta.is_empty());
    }

    #[test]
    fn meta_serializes_with_snake_case_keys() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut meta = TaskMeta::new();
        meta.set_in_progress(since);

        let v = serde_json::to_value(&meta).unwrap();
        assert!(v.get("in_progress").is_some());
    }

    #[test]
    fn garbage_flag_counts_as_ancient() {
        let mut meta = TaskMeta::new();
        meta.insert(MetaKey::InProgress, serde_json::json!(true));
        assert_eq!(meta.in_progress_since(), Some(DateTime::<Utc>::UNIX_EPOCH));
    }
}
