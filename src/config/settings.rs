use log::{info, warn};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub accounts: Vec<String>,
    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost".to_string()),
            accounts: env::var("ACCOUNTS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "43200".to_string())
                .parse()
                .unwrap_or(43_200),
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| "7200".to_string())
                .parse()
                .unwrap_or(7_200),
        }
    }

    pub fn validate_and_log(&self) {
        info!("Redis URL: {}", self.redis_url);
        info!("Accounts on the roster: {}", self.accounts.len());
        info!(
            "Snapshot TTL: {}s, refresh interval: {}s",
            self.cache_ttl_secs, self.refresh_interval_secs
        );
        if self.accounts.is_empty() {
            warn!("ACCOUNTS is empty; read operations will fail until accounts are configured");
        }
        if self.refresh_interval_secs >= self.cache_ttl_secs {
            warn!(
                "Refresh interval {}s is not shorter than the snapshot TTL {}s; cached feeds may expire between refreshes",
                self.refresh_interval_secs, self.cache_ttl_secs
            );
        }
    }
}
