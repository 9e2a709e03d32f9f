// src/feed/fetcher.rs
//! Read-through account fetcher: a Redis snapshot in front of the GitHub
//! search API, covering a rolling three-month window.

use crate::cache::CacheStore;
use crate::github::{normalize, PrState, PullRequest, PullRequestSource};
use chrono::{Local, Months, NaiveDate};
use log::warn;
use std::sync::Arc;

/// Combined-snapshot TTL, 12 hours.
pub const CACHE_TTL_SECS: u64 = 43_200;

const WINDOW_MONTHS: u32 = 3;

pub struct Fetcher {
    cache: Arc<dyn CacheStore>,
    source: Arc<dyn PullRequestSource>,
    cache_ttl_secs: u64,
}

impl Fetcher {
    pub fn new(cache: Arc<dyn CacheStore>, source: Arc<dyn PullRequestSource>) -> Self {
        Self::with_ttl(cache, source, CACHE_TTL_SECS)
    }

    pub fn with_ttl(
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn PullRequestSource>,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            cache,
            source,
            cache_ttl_secs,
        }
    }

    /// One combined key per account; the refresh job rewrites the same key
    /// the read path consults.
    fn cache_key(account: &str) -> String {
        format!("pr:{}", account)
    }

    /// Today minus three calendar months, date-only.
    fn window_start() -> NaiveDate {
        let today = Local::now().date_naive();
        today
            .checked_sub_months(Months::new(WINDOW_MONTHS))
            .unwrap_or(today)
    }

    /// Every pull request `account` authored in the last three months,
    /// served from the cache when a fresh snapshot exists. Cache-backend
    /// failures fall through to the upstream fetch; upstream failures
    /// degrade to an empty batch for this account only.
    pub async fn fetch_all(&self, account: &str) -> Vec<PullRequest> {
        let key = Self::cache_key(account);
        match self.cache.get(&key).await {
            Ok(Some(snapshot)) => match serde_json::from_str::<Vec<PullRequest>>(&snapshot) {
                Ok(cached) => return cached,
                Err(e) => {
                    warn!("Discarding undecodable cache snapshot for {}: {}", account, e)
                }
            },
            Ok(None) => {}
            Err(e) => warn!(
                "Cache read failed for {}, falling through to GitHub: {}",
                account, e
            ),
        }

        self.refresh(account).await
    }

    /// Fetches from GitHub and rewrites the cache snapshot, skipping the
    /// cache read. The scheduler uses this so its warming pass always
    /// lands fresh data.
    pub async fn refresh(&self, account: &str) -> Vec<PullRequest> {
        let items = match self.source.search(account, Self::window_start()).await {
            Ok(items) => items,
            Err(e) => {
                warn!("GitHub fetch failed for {}: {}", account, e);
                return Vec::new();
            }
        };

        let mut batch = Vec::with_capacity(items.len());
        for item in &items {
            match normalize(item) {
                Ok(pr) => batch.push(pr),
                Err(e) => warn!("Dropping malformed search item for {}: {}", account, e),
            }
        }

        match serde_json::to_string(&batch) {
            Ok(snapshot) => {
                if let Err(e) = self
                    .cache
                    .set(&Self::cache_key(account), &snapshot, self.cache_ttl_secs)
                    .await
                {
                    warn!("Cache write failed for {}: {}", account, e);
                }
            }
            Err(e) => warn!("Could not serialize snapshot for {}: {}", account, e),
        }

        batch
    }

    /// Open pull requests only; shares the one underlying combined fetch.
    pub async fn open(&self, account: &str) -> Vec<PullRequest> {
        self.filtered(account, PrState::Open).await
    }

    /// Closed pull requests only; shares the one underlying combined fetch.
    pub async fn closed(&self, account: &str) -> Vec<PullRequest> {
        self.filtered(account, PrState::Closed).await
    }

    async fn filtered(&self, account: &str, state: PrState) -> Vec<PullRequest> {
        self.fetch_all(account)
            .await
            .into_iter()
            .filter(|pr| pr.state == state)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{search_item, BrokenCache, MemoryCache, MockSource};
    use pretty_assertions::assert_eq;

    fn fetcher_with(
        cache: Arc<dyn CacheStore>,
        source: Arc<MockSource>,
    ) -> Fetcher {
        Fetcher::new(cache, source)
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_normalizes_and_writes_back() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());
        source
            .respond(
                "alice",
                vec![search_item(
                    "Add widget",
                    "https://api.github.com/repos/acme/widgets",
                    "2026-08-20T10:00:00Z",
                    "alice",
                    "open",
                    None,
                )],
            )
            .await;

        let fetcher = fetcher_with(cache.clone(), source.clone());
        let batch = fetcher.fetch_all("alice").await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].repo_name, "widgets");
        assert_eq!(batch[0].org_or_user_name, "acme");
        assert_eq!(source.calls(), 1);
        assert!(cache.contains("pr:alice").await);
    }

    #[tokio::test]
    async fn test_cache_hit_serves_snapshot_without_touching_upstream() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());

        let snapshot = vec![
            PullRequest {
                title: "First".to_string(),
                url: "https://github.com/acme/widgets/pull/1".to_string(),
                created_at: "2026-08-01T00:00:00Z".to_string(),
                user: "alice".to_string(),
                state: PrState::Open,
                repo_name: "widgets".to_string(),
                org_or_user_name: "acme".to_string(),
                merged: false,
            },
            PullRequest {
                title: "Second".to_string(),
                url: "https://github.com/acme/widgets/pull/2".to_string(),
                created_at: "2026-07-15T00:00:00Z".to_string(),
                user: "alice".to_string(),
                state: PrState::Closed,
                repo_name: "widgets".to_string(),
                org_or_user_name: "acme".to_string(),
                merged: true,
            },
        ];
        let serialized = serde_json::to_string(&snapshot).expect("serialize");
        cache
            .set("pr:alice", &serialized, CACHE_TTL_SECS)
            .await
            .expect("seed cache");

        let fetcher = fetcher_with(cache, source.clone());
        let batch = fetcher.fetch_all("alice").await;

        assert_eq!(batch, snapshot);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_all_is_idempotent_within_ttl() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());
        source
            .respond(
                "alice",
                vec![search_item(
                    "Add widget",
                    "https://api.github.com/repos/acme/widgets",
                    "2026-08-20T10:00:00Z",
                    "alice",
                    "open",
                    None,
                )],
            )
            .await;

        let fetcher = fetcher_with(cache, source.clone());
        let first = fetcher.fetch_all("alice").await;
        let second = fetcher.fetch_all("alice").await;

        assert_eq!(first, second);
        // Second call is a cache hit.
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_degrades_to_empty_batch() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());
        source.fail("alice").await;

        let fetcher = fetcher_with(cache, source);
        assert!(fetcher.fetch_all("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_item_is_dropped_not_fatal() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());
        let mut bad = search_item(
            "Broken",
            "https://api.github.com/repos/acme/widgets",
            "2026-08-19T10:00:00Z",
            "alice",
            "open",
            None,
        );
        bad.user = None;
        source
            .respond(
                "alice",
                vec![
                    bad,
                    search_item(
                        "Good",
                        "https://api.github.com/repos/acme/widgets",
                        "2026-08-20T10:00:00Z",
                        "alice",
                        "open",
                        None,
                    ),
                ],
            )
            .await;

        let fetcher = fetcher_with(cache, source);
        let batch = fetcher.fetch_all("alice").await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].title, "Good");
    }

    #[tokio::test]
    async fn test_broken_cache_fails_open_to_upstream() {
        let source = Arc::new(MockSource::new());
        source
            .respond(
                "alice",
                vec![search_item(
                    "Add widget",
                    "https://api.github.com/repos/acme/widgets",
                    "2026-08-20T10:00:00Z",
                    "alice",
                    "open",
                    None,
                )],
            )
            .await;

        let fetcher = fetcher_with(Arc::new(BrokenCache), source.clone());
        let batch = fetcher.fetch_all("alice").await;

        assert_eq!(batch.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_open_and_closed_filter_the_shared_fetch() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());
        source
            .respond(
                "alice",
                vec![
                    search_item(
                        "Open one",
                        "https://api.github.com/repos/acme/widgets",
                        "2026-08-20T10:00:00Z",
                        "alice",
                        "open",
                        None,
                    ),
                    search_item(
                        "Merged one",
                        "https://api.github.com/repos/acme/widgets",
                        "2026-08-18T10:00:00Z",
                        "alice",
                        "closed",
                        Some("2026-08-19T10:00:00Z"),
                    ),
                ],
            )
            .await;

        let fetcher = fetcher_with(cache, source.clone());
        let open = fetcher.open("alice").await;
        let closed = fetcher.closed("alice").await;

        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "Open one");
        assert_eq!(closed.len(), 1);
        assert!(closed[0].merged);
        // First call populated the cache; the second filtered from it.
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache_read_and_rewrites_snapshot() {
        let cache = Arc::new(MemoryCache::new());
        let source = Arc::new(MockSource::new());
        cache
            .set("pr:alice", "[]", CACHE_TTL_SECS)
            .await
            .expect("seed cache");
        source
            .respond(
                "alice",
                vec![search_item(
                    "Fresh",
                    "https://api.github.com/repos/acme/widgets",
                    "2026-08-20T10:00:00Z",
                    "alice",
                    "open",
                    None,
                )],
            )
            .await;

        let fetcher = fetcher_with(cache.clone(), source.clone());
        let batch = fetcher.refresh("alice").await;

        assert_eq!(batch.len(), 1);
        assert_eq!(source.calls(), 1);
        // The read path now sees the refreshed snapshot.
        let read = fetcher.fetch_all("alice").await;
        assert_eq!(read, batch);
        assert_eq!(source.calls(), 1);
    }
}
