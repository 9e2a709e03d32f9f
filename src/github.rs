// src/github.rs
//! GitHub search API client and the raw-to-normalized transformation.

use crate::error::{FeedError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const GITHUB_SEARCH_URL: &str = "https://api.github.com/search/issues";
const USER_AGENT: &str = concat!("pr-feed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
}

/// Normalized pull-request record, the shape stored in the cache and
/// returned to callers. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    pub url: String,
    /// ISO-8601 creation timestamp; the sole sort key for the feed.
    pub created_at: String,
    /// Author login. Not necessarily a roster member.
    pub user: String,
    pub state: PrState,
    pub repo_name: String,
    pub org_or_user_name: String,
    /// True only for closed pull requests whose upstream merge timestamp
    /// is non-null.
    pub merged: bool,
}

// --- Raw search API payload ---

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub repository_url: String,
    pub html_url: String,
    pub title: String,
    pub created_at: String,
    pub user: Option<SearchItemUser>,
    pub state: String,
    #[serde(default)]
    pub pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItemUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(default)]
    pub merged_at: Option<String>,
}

/// Converts one raw search item into exactly one [`PullRequest`].
///
/// Errors when the item violates the upstream contract: a `repository_url`
/// with fewer than two path segments, a missing author, or an unknown
/// state. Callers drop the offending item and keep the rest of the batch.
pub fn normalize(item: &SearchItem) -> Result<PullRequest> {
    let mut segments = item
        .repository_url
        .split('/')
        .rev()
        .filter(|s| !s.is_empty());
    let repo_name = segments.next().ok_or_else(|| {
        FeedError::Parse(format!(
            "repository_url '{}' has no path segments",
            item.repository_url
        ))
    })?;
    let org_or_user_name = segments.next().ok_or_else(|| {
        FeedError::Parse(format!(
            "repository_url '{}' is missing its owner segment",
            item.repository_url
        ))
    })?;

    let user = item
        .user
        .as_ref()
        .ok_or_else(|| FeedError::Parse(format!("search item '{}' has no author", item.title)))?;

    let state = match item.state.as_str() {
        "open" => PrState::Open,
        "closed" => PrState::Closed,
        other => {
            return Err(FeedError::Parse(format!(
                "unknown pull request state '{}'",
                other
            )))
        }
    };

    let merged = state == PrState::Closed
        && item
            .pull_request
            .as_ref()
            .map_or(false, |pr| pr.merged_at.is_some());

    Ok(PullRequest {
        title: item.title.clone(),
        url: item.html_url.clone(),
        created_at: item.created_at.clone(),
        user: user.login.clone(),
        state,
        repo_name: repo_name.to_string(),
        org_or_user_name: org_or_user_name.to_string(),
        merged,
    })
}

/// Upstream source of raw pull-request search items.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Every search item authored by `account` and created on or after
    /// `since` (the upstream API bounds the result window itself).
    async fn search(&self, account: &str, since: NaiveDate) -> Result<Vec<SearchItem>>;
}

/// Thin client over the GitHub issue search endpoint. Unauthenticated.
pub struct GithubClient {
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PullRequestSource for GithubClient {
    async fn search(&self, account: &str, since: NaiveDate) -> Result<Vec<SearchItem>> {
        let query = format!(
            "is:pr author:{} created:>={}",
            account,
            since.format("%Y-%m-%d")
        );
        let response = self
            .http
            .get(GITHUB_SEARCH_URL)
            .query(&[("q", query.as_str())])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Upstream(format!(
                "GitHub search returned {} for account {}",
                status, account
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.items)
    }
}
