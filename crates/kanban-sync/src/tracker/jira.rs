//! Jira REST client.
//!
//! Server and Data Center sites page `/rest/api/2/search` by `startAt`; Cloud
//! sites page `/rest/api/3/search/jql` by `nextPageToken`.

use kanban_core::ExternalRecord;
use serde_json::Value;
use tracing::{debug, warn};

use super::{IssueTracker, SearchResults, TrackerError};
use crate::config::{AccountConfig, JiraApi};

const SERVER_SEARCH_PATH: &str = "/rest/api/2/search";
const CLOUD_SEARCH_PATH: &str = "/rest/api/3/search/jql";
const SEARCH_FIELDS: &str = "summary,status";

pub struct JiraClient {
    alias: String,
    base_url: String,
    email: String,
    token: String,
    page_size: u32,
    api: JiraApi,
    http: reqwest::Client,
}

impl JiraClient {
    /// Build a client for `account`, reading its API token from the environment.
    pub fn from_account(account: &AccountConfig) -> Result<Self, TrackerError> {
        let token = std::env::var(&account.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TrackerError::MissingToken {
                alias: account.alias.clone(),
                var: account.token_env.clone(),
            })?;
        Ok(Self::new(account, token))
    }

    pub fn new(account: &AccountConfig, token: String) -> Self {
        let base_url = account.base_url.trim_end_matches('/').to_string();
        Self {
            alias: account.alias.clone(),
            api: account.api.resolve(&base_url),
            base_url,
            email: account.email.clone(),
            token,
            page_size: account.page_size,
            http: reqwest::Client::new(),
        }
    }

    fn http_error(&self, source: reqwest::Error) -> TrackerError {
        TrackerError::Http {
            alias: self.alias.clone(),
            source,
        }
    }

    async fn fetch_page(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, TrackerError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.token))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Status {
                alias: self.alias.clone(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response.json().await.map_err(|e| self.http_error(e))
    }

    async fn search_server(&self, query: &str) -> Result<SearchResults, TrackerError> {
        let mut results = SearchResults::default();
        let max_results = self.page_size.to_string();
        let mut start_at = 0;

        loop {
            let start = start_at.to_string();
            let body = self
                .fetch_page(
                    SERVER_SEARCH_PATH,
                    &[
                        ("jql", query),
                        ("fields", SEARCH_FIELDS),
                        ("startAt", start.as_str()),
                        ("maxResults", max_results.as_str()),
                    ],
                )
                .await?;
            let page = parse_search_page(&body)?;
            debug!(
                "{}: page at {} returned {} issue(s) of {}",
                self.alias, start_at, page.issue_count, page.total
            );

            results.records.extend(page.records);
            results.rejected += page.rejected;
            start_at += page.issue_count;

            if page.issue_count == 0 || start_at >= page.total {
                break;
            }
        }

        Ok(results)
    }

    async fn search_cloud(&self, query: &str) -> Result<SearchResults, TrackerError> {
        let mut results = SearchResults::default();
        let max_results = self.page_size.to_string();
        let mut token: Option<String> = None;

        loop {
            let mut params = vec![
                ("jql", query),
                ("fields", SEARCH_FIELDS),
                ("maxResults", max_results.as_str()),
            ];
            if let Some(token) = &token {
                params.push(("nextPageToken", token.as_str()));
            }
            let body = self.fetch_page(CLOUD_SEARCH_PATH, &params).await?;
            let page = parse_search_page(&body)?;
            debug!(
                "{}: page returned {} issue(s), last: {}",
                self.alias, page.issue_count, page.is_last
            );

            results.records.extend(page.records);
            results.rejected += page.rejected;

            match page.next_page_token {
                Some(next) if !page.is_last && page.issue_count > 0 && token.as_ref() != Some(&next) => {
                    token = Some(next)
                }
                _ => break,
            }
        }

        Ok(results)
    }
}

#[async_trait::async_trait]
impl IssueTracker for JiraClient {
    fn alias(&self) -> &str {
        &self.alias
    }

    async fn search(&self, query: &str) -> Result<SearchResults, TrackerError> {
        match self.api {
            JiraApi::Cloud => self.search_cloud(query).await,
            JiraApi::Server | JiraApi::Auto => self.search_server(query).await,
        }
    }
}

/// One page of search results.
#[derive(Debug, Default)]
pub struct SearchPage {
    /// Issues that carried a key and a status
    pub records: Vec<ExternalRecord>,
    /// Issues dropped for lacking a key or status
    pub rejected: usize,
    /// Issues on the page, including rejected ones
    pub issue_count: usize,
    /// Total matches reported by the server; Cloud omits it
    pub total: usize,
    /// Cursor for the next Cloud page
    pub next_page_token: Option<String>,
    /// Cloud's end-of-results flag; true when absent
    pub is_last: bool,
}

/// Pull `key`, `fields.status.name` and `fields.summary` out of a search response.
///
/// Accepts both the v2 (`total`) and the Cloud v3 (`nextPageToken`, `isLast`)
/// shapes. Issues without a key or status are dropped with a warning and
/// counted; a body without an `issues` array is an error.
pub fn parse_search_page(body: &Value) -> Result<SearchPage, TrackerError> {
    let issues = body
        .get("issues")
        .and_then(Value::as_array)
        .ok_or_else(|| TrackerError::InvalidResponse("missing `issues` array".into()))?;

    let total = body
        .get("total")
        .and_then(Value::as_u64)
        .map(|t| t as usize)
        .unwrap_or(issues.len());
    let next_page_token = body
        .get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let is_last = body
        .get("isLast")
        .and_then(Value::as_bool)
        .unwrap_or(next_page_token.is_none());

    let mut page = SearchPage {
        records: Vec::with_capacity(issues.len()),
        rejected: 0,
        issue_count: issues.len(),
        total,
        next_page_token,
        is_last,
    };

    for issue in issues {
        let key = issue.get("key").and_then(Value::as_str);
        let fields = issue.get("fields");
        let status = fields
            .and_then(|f| f.pointer("/status/name"))
            .and_then(Value::as_str);
        let summary = fields
            .and_then(|f| f.get("summary"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        match (key, status) {
            (Some(key), Some(status)) => {
                page.records.push(ExternalRecord::new(key, status, summary));
                continue;
            }
            (Some(key), None) => warn!("Skipping issue {}: no status", key),
            (None, _) => warn!("Skipping issue without a key"),
        }
        page.rejected += 1;
    }

    Ok(page)
}
