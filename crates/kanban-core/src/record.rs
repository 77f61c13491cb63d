//! Records fetched from the issue tracker.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::task::is_valid_key;

/// One issue as reported by the tracker for this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    /// Tracker key: "ABC-123"
    pub key: String,
    /// Tracker status name: "In Progress"
    pub status: String,
    /// One-line issue title
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record has no key")]
    MissingKey,
    #[error("record {key} has no status")]
    MissingStatus { key: String },
    #[error("'{key}' is not a valid issue key")]
    InvalidKey { key: String },
    #[error("record {key} has a multi-line status")]
    MultilineStatus { key: String },
}

impl ExternalRecord {
    pub fn new(
        key: impl Into<String>,
        status: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            status: status.into(),
            summary: summary.into(),
        }
    }

    /// Check the record can be placed on a board, trimming key and status.
    pub fn validated(self) -> Result<Self, RecordError> {
        let key = self.key.trim().to_string();
        if key.is_empty() {
            return Err(RecordError::MissingKey);
        }
        if !is_valid_key(&key) {
            return Err(RecordError::InvalidKey { key });
        }

        let status = self.status.trim().to_string();
        if status.is_empty() {
            return Err(RecordError::MissingStatus { key });
        }
        if status.contains('\n') {
            return Err(RecordError::MultilineStatus { key });
        }

        Ok(Self {
            key,
            status,
            summary: self.summary,
        })
    }
}

/// Records that survived validation, first occurrence per key.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub records: Vec<ExternalRecord>,
    pub rejected: Vec<RecordError>,
}

impl RecordSet {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ExternalRecord>,
    {
        let mut set = Self::default();
        let mut seen = HashSet::new();

        for record in records {
            match record.validated() {
                Ok(record) => {
                    if seen.insert(record.key.clone()) {
                        set.records.push(record);
                    } else {
                        debug!("Ignoring repeated record for {}", record.key);
                    }
                }
                Err(e) => {
                    warn!("Rejecting tracker record: {}", e);
                    set.rejected.push(e);
                }
            }
        }

        set
    }

    pub fn get(&self, key: &str) -> Option<&ExternalRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_key_and_status() {
        let record = ExternalRecord::new(" ABC-1 ", " In Progress\t", "Fix it")
            .validated()
            .unwrap();
        assert_eq!(record.key, "ABC-1");
        assert_eq!(record.status, "In Progress");
    }

    #[test]
    fn rejects_malformed_records() {
        assert_eq!(
            ExternalRecord::new("", "Done", "").validated(),
            Err(RecordError::MissingKey)
        );
        assert!(matches!(
            ExternalRecord::new("ABC-1", "  ", "").validated(),
            Err(RecordError::MissingStatus { .. })
        ));
        assert!(matches!(
            ExternalRecord::new("not a key", "Done", "").validated(),
            Err(RecordError::InvalidKey { .. })
        ));
        assert!(matches!(
            ExternalRecord::new("ABC-1", "Done\n## Evil", "").validated(),
            Err(RecordError::MultilineStatus { .. })
        ));
    }

    #[test]
    fn set_keeps_first_record_per_key_and_counts_rejects() {
        let set = RecordSet::from_records(vec![
            ExternalRecord::new("ABC-1", "To Do", ""),
            ExternalRecord::new("ABC-1", "Done", ""),
            ExternalRecord::new("", "Done", ""),
            ExternalRecord::new("ABC-2", "Done", ""),
        ]);

        assert_eq!(set.records.len(), 2);
        assert_eq!(set.get("ABC-1").map(|r| r.status.as_str()), Some("To Do"));
        assert_eq!(set.rejected.len(), 1);
    }

    #[test]
    fn summary_defaults_when_missing() {
        let record: ExternalRecord =
            serde_json::from_str(r#"{"key": "ABC-1", "status": "Done"}"#).unwrap();
        assert_eq!(record.summary, "");
    }
}
