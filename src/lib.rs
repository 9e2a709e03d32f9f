pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod github;
pub mod testing; // Testing infrastructure
pub mod utils;

// Re-export the engine surface for external collaborators (router, probes)
pub use cache::{CacheStore, RedisCache};
pub use config::{Config, RosterProvider, StaticRoster};
pub use error::{FeedError, RetryPolicy};
pub use feed::{Aggregator, Fetcher, RefreshScheduler};
pub use github::{GithubClient, PrState, PullRequest, PullRequestSource};
