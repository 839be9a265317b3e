//! Update history
//!
//! Every save that reaches the control plane is recorded, successful or not.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shipyard_core::ResourceId;

/// Kind of recorded update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOperation {
    UpdateConfig,
}

/// One update attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub resource_id: ResourceId,
    pub operation: UpdateOperation,
    /// Top-level config keys that were submitted
    pub fields: Vec<String>,
    /// User id of the operator
    pub operator: String,
    pub ts: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded log of update attempts, oldest evicted first
#[derive(Debug)]
pub struct UpdateHistory {
    entries: VecDeque<UpdateRecord>,
    max_entries: usize,
}

impl UpdateHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn record(&mut self, record: UpdateRecord) {
        if self.max_entries == 0 {
            return;
        }
        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records, newest first
    pub fn recent(&self) -> impl Iterator<Item = &UpdateRecord> {
        self.entries.iter().rev()
    }

    /// Records for one resource, newest first
    pub fn for_resource<'a>(
        &'a self,
        id: &'a ResourceId,
    ) -> impl Iterator<Item = &'a UpdateRecord> + 'a {
        self.recent().filter(move |record| &record.resource_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, success: bool) -> UpdateRecord {
        UpdateRecord {
            resource_id: id.into(),
            operation: UpdateOperation::UpdateConfig,
            fields: vec!["image".into()],
            operator: "alice".into(),
            ts: Utc::now(),
            success,
            error: (!success).then(|| "Network error: refused".to_string()),
        }
    }

    #[test]
    fn test_newest_first_per_resource() {
        let mut history = UpdateHistory::new(10);
        history.record(record("dep-1", false));
        history.record(record("srv-1", true));
        history.record(record("dep-1", true));

        let dep_id = "dep-1".into();
        let dep: Vec<_> = history.for_resource(&dep_id).collect();
        assert_eq!(dep.len(), 2);
        assert!(dep[0].success);
        assert!(!dep[1].success);
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut history = UpdateHistory::new(2);
        history.record(record("a", true));
        history.record(record("b", true));
        history.record(record("c", true));

        let ids: Vec<_> = history.recent().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut history = UpdateHistory::new(0);
        history.record(record("a", true));
        assert!(history.is_empty());
    }

    #[test]
    fn test_record_json_omits_missing_error() {
        let json = serde_json::to_value(record("dep-1", true)).unwrap();
        assert_eq!(json["operation"], "update_config");
        assert!(json.get("error").is_none());
    }
}
