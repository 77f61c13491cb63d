//! Issue tracker access.
//!
//! Every configured account is queried concurrently; a failing account
//! costs its own records and nothing else.

mod jira;

pub use jira::{parse_search_page, JiraClient, SearchPage};

use futures::future::join_all;
use kanban_core::ExternalRecord;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("API token for account '{alias}' not found: set {var}")]
    MissingToken { alias: String, var: String },

    #[error("Request to {alias} failed: {source}")]
    Http {
        alias: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{alias} returned HTTP {status}: {body}")]
    Status {
        alias: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected search response: {0}")]
    InvalidResponse(String),
}

/// Issues returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub records: Vec<ExternalRecord>,
    /// Issues dropped for lacking a key or status
    pub rejected: usize,
}

impl SearchResults {
    /// Issues seen, including rejected ones.
    pub fn seen(&self) -> usize {
        self.records.len() + self.rejected
    }
}

/// A source of issue records, one instance per account.
#[async_trait::async_trait]
pub trait IssueTracker: Send + Sync {
    /// Account alias used in logs.
    fn alias(&self) -> &str;

    /// Every issue matching `query`, across all result pages.
    async fn search(&self, query: &str) -> Result<SearchResults, TrackerError>;
}

/// Query every tracker at once and concatenate results in tracker order.
pub async fn fetch_all(trackers: &[Box<dyn IssueTracker>], query: &str) -> SearchResults {
    let results = join_all(trackers.iter().map(|tracker| async move {
        (tracker.alias(), tracker.search(query).await)
    }))
    .await;

    let mut all = SearchResults::default();
    for (alias, result) in results {
        match result {
            Ok(found) => {
                info!(
                    "Fetched {} issue(s) from {} ({} rejected)",
                    found.records.len(),
                    alias,
                    found.rejected
                );
                all.records.extend(found.records);
                all.rejected += found.rejected;
            }
            Err(e) => warn!("Skipping account {}: {}", alias, e),
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fixed {
        alias: &'static str,
        delay_ms: u64,
        result: Result<Vec<(&'static str, &'static str)>, ()>,
        rejected: usize,
    }

    #[async_trait::async_trait]
    impl IssueTracker for Fixed {
        fn alias(&self) -> &str {
            self.alias
        }

        async fn search(&self, _query: &str) -> Result<SearchResults, TrackerError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            match &self.result {
                Ok(items) => Ok(SearchResults {
                    records: items
                        .iter()
                        .map(|(key, status)| ExternalRecord::new(*key, *status, ""))
                        .collect(),
                    rejected: self.rejected,
                }),
                Err(()) => Err(TrackerError::InvalidResponse("boom".into())),
            }
        }
    }

    #[tokio::test]
    async fn results_follow_configuration_order() {
        let trackers: Vec<Box<dyn IssueTracker>> = vec![
            Box::new(Fixed {
                alias: "slow",
                delay_ms: 30,
                result: Ok(vec![("A-1", "To Do")]),
                rejected: 0,
            }),
            Box::new(Fixed {
                alias: "fast",
                delay_ms: 0,
                result: Ok(vec![("B-1", "Done"), ("B-2", "To Do")]),
                rejected: 0,
            }),
        ];

        let found = fetch_all(&trackers, "q").await;
        let keys: Vec<_> = found.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A-1", "B-1", "B-2"]);
    }

    #[tokio::test]
    async fn failing_account_contributes_nothing() {
        let trackers: Vec<Box<dyn IssueTracker>> = vec![
            Box::new(Fixed {
                alias: "down",
                delay_ms: 0,
                result: Err(()),
                rejected: 4,
            }),
            Box::new(Fixed {
                alias: "up",
                delay_ms: 0,
                result: Ok(vec![("B-1", "Done")]),
                rejected: 0,
            }),
        ];

        let found = fetch_all(&trackers, "q").await;
        assert_eq!(found.records, vec![ExternalRecord::new("B-1", "Done", "")]);
        assert_eq!(found.rejected, 0);
    }

    #[tokio::test]
    async fn rejected_issues_are_summed_across_accounts() {
        let trackers: Vec<Box<dyn IssueTracker>> = vec![
            Box::new(Fixed {
                alias: "a",
                delay_ms: 0,
                result: Ok(vec![("A-1", "To Do")]),
                rejected: 2,
            }),
            Box::new(Fixed {
                alias: "b",
                delay_ms: 0,
                result: Ok(vec![]),
                rejected: 1,
            }),
        ];

        let found = fetch_all(&trackers, "q").await;
        assert_eq!(found.rejected, 3);
        assert_eq!(found.seen(), 4);
    }

    #[tokio::test]
    async fn no_trackers_means_no_records() {
        assert_eq!(fetch_all(&[], "q").await, SearchResults::default());
    }
}
