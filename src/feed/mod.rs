// src/feed/mod.rs
//! The PR cache & aggregation engine: per-account read-through fetching,
//! roster-wide fan-out, and the background cache refresh job.

pub mod aggregator;
pub mod fetcher;
pub mod scheduler;

pub use aggregator::Aggregator;
pub use fetcher::Fetcher;
pub use scheduler::RefreshScheduler;
