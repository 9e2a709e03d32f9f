// src/main.rs

use log::{info, warn};
use pr_feed::{
    config, Aggregator, CacheStore, Fetcher, GithubClient, RedisCache, RefreshScheduler,
    RetryPolicy, StaticRoster,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    pr_feed::utils::setup_logging()?;

    // Exits with an error when required variables are missing.
    let app_config = config::env::load_config();
    app_config.validate_and_log();

    let cache = Arc::new(RedisCache::new(&app_config.redis_url, RetryPolicy::default()));
    match cache.ping().await {
        Ok(true) => info!("Redis liveness probe succeeded"),
        Ok(false) => warn!("Redis is reachable but the liveness round trip failed"),
        Err(e) => warn!("Redis unreachable at startup, will retry on first use: {}", e),
    }

    let source = Arc::new(GithubClient::new());
    let fetcher = Arc::new(Fetcher::with_ttl(
        cache.clone(),
        source,
        app_config.cache_ttl_secs,
    ));
    let roster = Arc::new(StaticRoster::new(app_config.accounts.clone()));

    let scheduler = RefreshScheduler::with_interval(
        Arc::clone(&fetcher),
        roster.clone(),
        Duration::from_secs(app_config.refresh_interval_secs),
    );
    let scheduler_handle = scheduler.spawn();

    let aggregator = Aggregator::new(fetcher, roster);
    match aggregator.all().await {
        Ok(feed) => info!(
            "Serving {} pull requests across {} accounts",
            feed.len(),
            app_config.accounts.len()
        ),
        Err(e) => warn!("Initial aggregation failed: {}", e),
    }

    info!("pr-feed running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    scheduler_handle.abort();
    cache.close().await;
    info!("Shut down cleanly");
    Ok(())
}
