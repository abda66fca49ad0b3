//! Pagination over the collection endpoint
//!
//! # Overview
//!
//! Two traversal styles over the same page-numbered resource:
//! - `paginate` - a lazy sequential stream of releases, restartable from any
//!   page
//! - `TrackedPaginator` - a pull-based page iterator that mutates an external
//!   [`PageTracker`] after each page, so callers can checkpoint progress
//!   between pages
//!
//! Both styles pin the first observed pagination envelope and treat any later
//! disagreement (total pages or total items) as the remote collection having
//! mutated mid-fetch: a hard `PaginationConsistency` error, not a warning.

mod tracker;
mod traverse;

pub use tracker::PageTracker;
pub use traverse::{paginate, TrackedPaginator};
