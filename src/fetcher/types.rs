//! Fetcher configuration and supporting types

use std::time::Duration;

/// Callback invoked after each fetched record with `(fetched, total)`
pub type ProgressCallback<'a> = Box<dyn FnMut(u64, u64) + Send + 'a>;

/// Lifecycle of a fetch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Constructed with no prior state
    Fresh,
    /// Constructed from persisted state for the same owner
    Resuming,
    /// A fetch is in flight
    Fetching,
    /// The last fetch drained the collection
    Complete,
    /// The last fetch aborted on a fatal error or cancellation
    Failed,
}

/// Configuration for [`CollectionFetcher`](super::CollectionFetcher)
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Owner identity the fetch and its persisted state are scoped to
    pub owner: String,
    /// Items requested per API page
    pub per_page: u32,
    /// Maximum concurrently in-flight page requests
    pub max_concurrent: usize,
    /// Persist state every N fetched items (0 disables the item trigger)
    pub save_interval_items: u64,
    /// Persist state when this much time has passed since the last save
    pub save_interval: Duration,
    /// Load persisted state for this owner at construction
    pub resume: bool,
}

impl FetcherConfig {
    /// Create a config with defaults for the given owner
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            per_page: 100,
            max_concurrent: 5,
            save_interval_items: 50,
            save_interval: Duration::from_secs(30),
            resume: false,
        }
    }

    /// Create a config builder for the given owner
    pub fn builder(owner: impl Into<String>) -> FetcherConfigBuilder {
        FetcherConfigBuilder {
            config: Self::new(owner),
        }
    }
}

/// Builder for [`FetcherConfig`]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Set items per page
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.config.per_page = per_page;
        self
    }

    /// Set the in-flight page request bound
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    /// Set the item-count save trigger
    pub fn save_interval_items(mut self, items: u64) -> Self {
        self.config.save_interval_items = items;
        self
    }

    /// Set the elapsed-time save trigger
    pub fn save_interval(mut self, interval: Duration) -> Self {
        self.config.save_interval = interval;
        self
    }

    /// Resume from persisted state if present
    pub fn resume(mut self, resume: bool) -> Self {
        self.config.resume = resume;
        self
    }

    /// Build the config
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}
