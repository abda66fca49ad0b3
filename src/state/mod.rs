//! Progress state and persistence
//!
//! Durable fetch progress, one JSON document per owner, so an interrupted
//! fetch resumes instead of starting over.
//!
//! # Overview
//!
//! The state module provides:
//! - `ProgressState` - a snapshot of fetch progress for one owner
//! - `StateStore` - atomic file-based persistence, scoped by owner

mod store;
mod types;

pub use store::StateStore;
pub use types::{ProgressState, STATE_VERSION};
