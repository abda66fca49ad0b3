//! Discogs API access
//!
//! # Overview
//!
//! The api module provides:
//! - `DiscogsClient` - typed, authenticated, rate-limited transport
//! - `RateLimiter` - token-bucket admission control shared by all calls
//! - wire models for collection pages, releases, and value statistics

mod client;
mod models;
mod rate_limit;

pub use client::{ClientConfig, ClientConfigBuilder, DiscogsClient, MAX_PER_PAGE};
pub use models::{
    Artist, BasicInformation, CollectionPage, CollectionValue, Format, Label, Note, Pagination,
    Release,
};
pub use rate_limit::{RateLimitConfig, RateLimiter};
