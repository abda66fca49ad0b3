//! # discogs-sync
//!
//! Resilient, resumable collection fetching from the Discogs API.
//!
//! The crate covers one job well: retrieving a complete, paginated,
//! rate-limited collection reliably: bounded concurrency, consistent
//! pagination, typed error classification, and crash-resumable progress.
//! Exporters, cover-art downloads, QR generation, and any CLI are
//! downstream consumers of the sequences this crate produces.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use discogs_sync::{
//!     CollectionFetcher, Credentials, DiscogsClient, FetcherConfig, Result, StateStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let credentials = Credentials::new("username", "api-token");
//!     let client = DiscogsClient::new(&credentials)?;
//!     let store = StateStore::new("~/.discogs-sync");
//!
//!     let config = FetcherConfig::builder("username").resume(true).build();
//!     let mut fetcher = CollectionFetcher::new(client, store, config).await;
//!
//!     let releases = fetcher
//!         .fetch_all(Some(Box::new(|current, total| {
//!             println!("{current}/{total}");
//!         })))
//!         .await?;
//!
//!     println!("fetched {} releases", releases.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CollectionFetcher                       │
//! │  fetch_all / fetch_incremental / clear_state                │
//! │  progress callbacks · periodic persistence · cancellation   │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//! ┌──────────────┴──────────────┐  ┌─────────────┴──────────────┐
//! │        DiscogsClient        │  │         StateStore         │
//! │  status classification      │  │  one JSON doc per owner    │
//! │  concurrent page streaming  │  │  atomic temp-then-rename   │
//! ├─────────────────────────────┤  └────────────────────────────┘
//! │         RateLimiter         │
//! │  token bucket, one mutex    │
//! └─────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Credential storage seam
pub mod credentials;

/// API client, rate limiting, and wire models
pub mod api;

/// Pagination over the collection endpoint
pub mod pagination;

/// Progress state and persistence
pub mod state;

/// Collection fetch orchestration
pub mod fetcher;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{
    ClientConfig, CollectionPage, CollectionValue, DiscogsClient, Pagination, RateLimitConfig,
    RateLimiter, Release,
};
pub use credentials::{CredentialStore, Credentials, MemoryCredentialStore};
pub use error::{Error, Result};
pub use fetcher::{fetch_collection, CollectionFetcher, FetchPhase, FetcherConfig};
pub use pagination::{paginate, PageTracker, TrackedPaginator};
pub use state::{ProgressState, StateStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
