pub mod env;
pub mod settings;

pub use settings::Config;

use crate::error::FeedError;

/// Supplies the account roster to the read and refresh paths at call time.
pub trait RosterProvider: Send + Sync {
    /// The ordered roster. An empty roster is a configuration error,
    /// distinct from a roster whose accounts simply have no pull requests.
    fn accounts(&self) -> Result<Vec<String>, FeedError>;
}

/// Roster backed by a fixed list, typically `Config::accounts`.
pub struct StaticRoster {
    accounts: Vec<String>,
}

impl StaticRoster {
    pub fn new(accounts: Vec<String>) -> Self {
        Self { accounts }
    }
}

impl RosterProvider for StaticRoster {
    fn accounts(&self) -> Result<Vec<String>, FeedError> {
        if self.accounts.is_empty() {
            return Err(FeedError::Config("no accounts configured".to_string()));
        }
        Ok(self.accounts.clone())
    }
}
