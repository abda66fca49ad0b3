//! Sequential and tracker-driven traversal

use async_stream::try_stream;
use futures::stream::Stream;
use tracing::{debug, info};

use super::tracker::PageTracker;
use crate::api::{DiscogsClient, Pagination, Release, MAX_PER_PAGE};
use crate::error::{Error, Result};

/// Paginate through the entire collection sequentially.
///
/// Fetches pages one at a time starting from `start_page` (1-indexed, so a
/// resume can skip ahead) and yields individual releases in collection
/// order. For large collections prefer
/// [`DiscogsClient::stream_collection`], which fetches pages concurrently.
pub fn paginate(
    client: &DiscogsClient,
    per_page: u32,
    start_page: u32,
) -> impl Stream<Item = Result<Release>> + '_ {
    try_stream! {
        validate_args(per_page, start_page)?;

        let mut current_page = start_page;
        let mut expected_pages = 0u32;
        let mut expected_items = 0u64;

        loop {
            debug!(page = current_page, "fetching page");
            let page = client.collection_page(current_page, per_page).await?;

            if expected_pages == 0 {
                expected_pages = page.pagination.pages;
                expected_items = page.pagination.items;
                info!(
                    items = expected_items,
                    pages = expected_pages,
                    "collection inventory"
                );
            }
            check_envelope(
                expected_pages,
                expected_items,
                current_page,
                &page.pagination,
            )?;

            for release in page.releases {
                yield release;
            }

            if current_page >= expected_pages {
                debug!(pages = current_page, "pagination complete");
                break;
            }
            current_page += 1;
        }
    }
}

fn validate_args(per_page: u32, start_page: u32) -> Result<()> {
    if start_page < 1 {
        return Err(Error::config(format!(
            "invalid start_page: {start_page} (must be >= 1)"
        )));
    }
    if per_page < 1 || per_page > MAX_PER_PAGE {
        return Err(Error::config(format!(
            "invalid per_page: {per_page} (must be 1-{MAX_PER_PAGE})"
        )));
    }
    Ok(())
}

fn check_envelope(
    expected_pages: u32,
    expected_items: u64,
    requested: u32,
    got: &Pagination,
) -> Result<()> {
    if got.pages != expected_pages || got.items != expected_items {
        return Err(Error::pagination(format!(
            "collection changed mid-fetch: expected {expected_pages} pages / \
             {expected_items} items, got {} pages / {} items",
            got.pages, got.items
        )));
    }
    if got.page != requested {
        return Err(Error::pagination(format!(
            "page mismatch: requested page {requested}, got page {}",
            got.page
        )));
    }
    Ok(())
}

/// Pull-based paginator that mutates an external [`PageTracker`].
///
/// Each `next_page` call fetches one page, folds it into the tracker, and
/// returns that page's releases. Callers inspect and persist the tracker
/// between calls; the checkpoint cadence is theirs, not the fetch loop's.
#[derive(Debug)]
pub struct TrackedPaginator<'a> {
    client: &'a DiscogsClient,
    per_page: u32,
    tracker: PageTracker,
}

impl<'a> TrackedPaginator<'a> {
    /// Start a fresh traversal from page 1.
    pub fn new(client: &'a DiscogsClient, per_page: u32) -> Result<Self> {
        Self::resume(client, per_page, PageTracker::new())
    }

    /// Continue a traversal from a previously checkpointed tracker.
    pub fn resume(client: &'a DiscogsClient, per_page: u32, tracker: PageTracker) -> Result<Self> {
        if per_page < 1 || per_page > MAX_PER_PAGE {
            return Err(Error::config(format!(
                "invalid per_page: {per_page} (must be 1-{MAX_PER_PAGE})"
            )));
        }
        if tracker.current_page < 1 {
            return Err(Error::config(format!(
                "invalid tracker page: {} (must be >= 1)",
                tracker.current_page
            )));
        }
        Ok(Self {
            client,
            per_page,
            tracker,
        })
    }

    /// Current traversal progress.
    pub fn tracker(&self) -> &PageTracker {
        &self.tracker
    }

    /// Fetch the next page and fold it into the tracker.
    ///
    /// Returns `None` once the last known page has been consumed. Totals
    /// observed on the first fetched page are pinned; later disagreement is
    /// a `PaginationConsistency` error and the tracker is left untouched.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Release>>> {
        if self.tracker.is_complete() {
            return Ok(None);
        }

        let requested = self.tracker.current_page;
        let page = self.client.collection_page(requested, self.per_page).await?;

        // Before the first page the tracker has no totals; pin them from
        // this envelope so the echo check still applies.
        let (expected_pages, expected_items) = if self.tracker.total_pages > 0 {
            (self.tracker.total_pages, self.tracker.total_items)
        } else {
            (page.pagination.pages, page.pagination.items)
        };
        check_envelope(expected_pages, expected_items, requested, &page.pagination)?;

        self.tracker.record_page(&page.pagination, page.releases.len());
        debug!(tracker = %self.tracker, "page recorded");

        Ok(Some(page.releases))
    }
}
