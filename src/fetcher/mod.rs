//! Collection fetch orchestration
//!
//! # Overview
//!
//! The fetcher module composes the API client, pagination, and durable
//! progress state into the resumable fetch protocol:
//! - `CollectionFetcher` - fetch-all / fetch-incremental with progress
//!   callbacks, periodic persistence, and cooperative cancellation
//! - `FetcherConfig` - per-fetch tuning (page size, concurrency, save
//!   cadence, resume)
//! - `fetch_collection` - one-call convenience wrapper

mod collection;
mod types;

pub use collection::{fetch_collection, CollectionFetcher};
pub use types::{FetchPhase, FetcherConfig, FetcherConfigBuilder, ProgressCallback};

#[cfg(test)]
mod tests;
