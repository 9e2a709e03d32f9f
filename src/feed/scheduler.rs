// src/feed/scheduler.rs
//! Background job that keeps the roster's cache snapshots warm so the read
//! path rarely sees an expired entry.

use crate::config::RosterProvider;
use crate::feed::fetcher::Fetcher;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default refresh cadence, 2 hours. Well inside the 12-hour snapshot TTL,
/// so a healthy scheduler rewrites every entry long before it expires.
pub const REFRESH_INTERVAL_SECS: u64 = 7_200;

pub struct RefreshScheduler {
    fetcher: Arc<Fetcher>,
    roster: Arc<dyn RosterProvider>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(fetcher: Arc<Fetcher>, roster: Arc<dyn RosterProvider>) -> Self {
        Self::with_interval(fetcher, roster, Duration::from_secs(REFRESH_INTERVAL_SECS))
    }

    pub fn with_interval(
        fetcher: Arc<Fetcher>,
        roster: Arc<dyn RosterProvider>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            roster,
            interval,
        }
    }

    /// One warming pass over the whole roster, rewriting the same combined
    /// keys the read path consults. A single account's failure is logged
    /// and does not stop the remaining accounts.
    pub async fn refresh_all(&self) {
        let accounts = match self.roster.accounts() {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("Skipping cache refresh: {}", e);
                return;
            }
        };

        for account in &accounts {
            let batch = self.fetcher.refresh(account).await;
            info!("Refreshed {} pull requests for {}", batch.len(), account);
        }
        info!("Pull request cache updated for {} accounts", accounts.len());
    }

    /// Spawns the recurring refresh loop. Each pass runs inline in the
    /// loop, so a slow refresh delays the next tick instead of overlapping
    /// it. The first tick fires immediately and performs the initial
    /// warm-up.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "Refresh scheduler started with a {}s interval",
            self.interval.as_secs()
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                info!("Running scheduled pull request cache refresh");
                self.refresh_all().await;
            }
        })
    }
}
