//! Client for the GitHub-style issues endpoint.

use crate::config::IssuesConfig;
use crate::error::{PulseError, Result};
use crate::model::BugRecord;
use crate::util::spinner;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone)]
pub struct IssueQuery {
    pub owner: String,
    pub name: String,
    pub state: String,
    pub labels: String,
    pub per_page: u32,
    pub max_pages: u32,
}

impl IssueQuery {
    pub fn from_config(config: &IssuesConfig, owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            state: config.state.clone(),
            labels: config.labels.clone(),
            per_page: config.per_page,
            max_pages: config.max_pages.max(1),
        }
    }
}

pub struct IssueClient {
    client: Client,
    api_base: String,
}

impl IssueClient {
    pub fn new(config: &IssuesConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = config.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| PulseError::Config(format!("invalid issue tracker token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            tracing::debug!("sending issue tracker token");
        }

        let client = Client::builder()
            .timeout(config.timeout()?)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn issues_url(&self, query: &IssueQuery) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, query.owner, query.name)
    }

    /// Fetch pages until one comes back short or `max_pages` is reached.
    pub fn fetch_issues(&self, query: &IssueQuery) -> Result<Vec<Value>> {
        let url = self.issues_url(query);
        let mut all = Vec::new();
        let pb = spinner(format!("Fetching issues for {}/{}...", query.owner, query.name));

        for page in 1..=query.max_pages {
            tracing::info!(%url, page, "fetching issues");
            pb.set_message(format!("Fetching issues page {page}..."));
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("state", query.state.as_str()),
                    ("labels", query.labels.as_str()),
                    ("per_page", &query.per_page.to_string()),
                    ("page", &page.to_string()),
                ])
                .send()
                .inspect_err(|_| pb.finish_and_clear())?;

            let status = resp.status();
            if !status.is_success() {
                pb.finish_and_clear();
                return Err(PulseError::HttpStatus {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }

            let items: Vec<Value> = resp.json().inspect_err(|_| pb.finish_and_clear())?;
            let short = items.len() < query.per_page as usize;
            all.extend(items);
            if short {
                break;
            }
        }

        pb.finish_and_clear();
        Ok(all)
    }
}

/// Turn raw issue objects into bug records.
///
/// Pull requests (objects with a `pull_request` key) are dropped, as are
/// issues whose timestamps are missing or malformed.
pub fn bug_records(issues: &[Value]) -> Vec<BugRecord> {
    issues
        .iter()
        .filter(|issue| issue.get("pull_request").is_none())
        .filter_map(|issue| {
            let record = bug_record(issue);
            if record.is_none() {
                tracing::warn!(
                    number = issue.get("number").and_then(|n| n.as_u64()),
                    "skipping issue without usable timestamps"
                );
            }
            record
        })
        .collect()
}

fn bug_record(issue: &Value) -> Option<BugRecord> {
    let number = issue.get("number")?.as_u64()?;
    let title = issue.get("title").and_then(Value::as_str).unwrap_or_default();
    let created_at = parse_timestamp(issue.get("created_at")?.as_str()?)?;
    let closed_at = parse_timestamp(issue.get("closed_at")?.as_str()?)?;
    let duration_hours = (closed_at - created_at).num_seconds() as f64 / 3600.0;

    Some(BugRecord {
        number,
        title: title.to_string(),
        created_at,
        closed_at,
        duration_hours,
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}
