// src/feed/aggregator.rs
//! Roster-wide fan-out, merge, and ordering of pull-request batches.

use crate::config::RosterProvider;
use crate::error::Result;
use crate::feed::fetcher::Fetcher;
use crate::github::{PrState, PullRequest};
use chrono::{DateTime, Utc};
use log::warn;
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::task::JoinSet;

pub struct Aggregator {
    fetcher: Arc<Fetcher>,
    roster: Arc<dyn RosterProvider>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<Fetcher>, roster: Arc<dyn RosterProvider>) -> Self {
        Self { fetcher, roster }
    }

    /// All open pull requests across the roster. Unordered.
    pub async fn open(&self) -> Result<Vec<PullRequest>> {
        self.collect_state(PrState::Open).await
    }

    /// All closed pull requests across the roster. Unordered.
    pub async fn closed(&self) -> Result<Vec<PullRequest>> {
        self.collect_state(PrState::Closed).await
    }

    /// All open and closed pull requests across the roster, newest first.
    /// The open and closed waves run concurrently; within each wave, one
    /// task per account.
    pub async fn all(&self) -> Result<Vec<PullRequest>> {
        let (open, closed) = futures::future::join(
            self.collect_state(PrState::Open),
            self.collect_state(PrState::Closed),
        )
        .await;

        let mut all = open?;
        all.extend(closed?);
        all.sort_by_key(|pr| Reverse(sort_key(&pr.created_at)));
        Ok(all)
    }

    /// Spawns one fetch task per roster account and joins every one of
    /// them; a failed account contributes an empty batch (handled inside
    /// the fetcher) rather than aborting the wave. Batches are reassembled
    /// in roster order, not completion order, so equal-timestamp entries
    /// keep a deterministic relative order through the stable sort.
    async fn collect_state(&self, state: PrState) -> Result<Vec<PullRequest>> {
        let accounts = self.roster.accounts()?;
        let count = accounts.len();

        let mut tasks = JoinSet::new();
        for (index, account) in accounts.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            tasks.spawn(async move {
                let batch = match state {
                    PrState::Open => fetcher.open(&account).await,
                    PrState::Closed => fetcher.closed(&account).await,
                };
                (index, batch)
            });
        }

        let mut batches: Vec<Vec<PullRequest>> = vec![Vec::new(); count];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, batch)) => batches[index] = batch,
                Err(e) => warn!("Account fetch task failed to join: {}", e),
            }
        }
        Ok(batches.into_iter().flatten().collect())
    }
}

/// Total, never-failing ordering key: timestamps that do not parse sort as
/// earliest-possible.
fn sort_key(created_at: &str) -> DateTime<Utc> {
    created_at
        .parse::<DateTime<Utc>>()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
