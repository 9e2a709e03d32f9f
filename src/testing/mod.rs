// src/testing/mod.rs
//! In-memory test doubles for the cache store and the upstream source.
//! Shipped as a public module so integration tests can drive the whole
//! engine without Redis or GitHub.

use crate::cache::CacheStore;
use crate::error::{FeedError, Result};
use crate::github::{PullRequestRef, PullRequestSource, SearchItem, SearchItemUser};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// TTL-honoring in-memory stand-in for Redis.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Force-expires an entry, simulating TTL lapse without waiting.
    pub async fn expire(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.entries.lock().await.insert(
            key.to_string(),
            (value.to_string(), Instant::now() + Duration::from_secs(ttl_secs)),
        );
        Ok(())
    }

    async fn ping(&self) -> Result<bool> {
        self.set("livenessProbe", "ok", 30).await?;
        Ok(self.get("livenessProbe").await?.as_deref() == Some("ok"))
    }
}

/// Cache whose every operation fails, for fail-open behavior tests.
pub struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(FeedError::Cache("cache backend unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
        Err(FeedError::Cache("cache backend unavailable".to_string()))
    }

    async fn ping(&self) -> Result<bool> {
        Err(FeedError::Cache("cache backend unavailable".to_string()))
    }
}

/// Canned upstream source that counts how often it is queried, so tests
/// can assert that cache hits never reach GitHub.
#[derive(Default)]
pub struct MockSource {
    responses: Mutex<HashMap<String, Result<Vec<SearchItem>>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond(&self, account: &str, items: Vec<SearchItem>) {
        self.responses
            .lock()
            .await
            .insert(account.to_string(), Ok(items));
    }

    /// Delays this account's next responses, for tests that skew fetch
    /// completion order.
    pub async fn delay(&self, account: &str, delay: Duration) {
        self.delays.lock().await.insert(account.to_string(), delay);
    }

    pub async fn fail(&self, account: &str) {
        self.responses.lock().await.insert(
            account.to_string(),
            Err(FeedError::Upstream(format!(
                "simulated upstream failure for {}",
                account
            ))),
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestSource for MockSource {
    async fn search(&self, account: &str, _since: NaiveDate) -> Result<Vec<SearchItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().await.get(account).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.responses.lock().await.get(account) {
            Some(result) => result.clone(),
            None => Ok(Vec::new()),
        }
    }
}

/// Builds a search item in the shape the GitHub search endpoint returns.
pub fn search_item(
    title: &str,
    repository_url: &str,
    created_at: &str,
    login: &str,
    state: &str,
    merged_at: Option<&str>,
) -> SearchItem {
    SearchItem {
        repository_url: repository_url.to_string(),
        html_url: format!("{}/pull/1", repository_url.replace("api.github.com/repos", "github.com")),
        title: title.to_string(),
        created_at: created_at.to_string(),
        user: Some(SearchItemUser {
            login: login.to_string(),
        }),
        state: state.to_string(),
        pull_request: Some(PullRequestRef {
            merged_at: merged_at.map(str::to_string),
        }),
    }
}
