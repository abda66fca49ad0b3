//! Collection fetching and resume orchestration

use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::types::{FetchPhase, FetcherConfig, ProgressCallback};
use crate::api::{DiscogsClient, Release};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::pagination::paginate;
use crate::state::{ProgressState, StateStore};

/// Fetches a user's collection with progress tracking, periodic state
/// persistence, and resume support.
///
/// The fetcher is the only mutator of its [`ProgressState`]; page-fetch
/// workers run concurrently inside the client but record counting happens
/// here, on the orchestrating task, as the stream is drained.
#[derive(Debug)]
pub struct CollectionFetcher {
    client: DiscogsClient,
    store: StateStore,
    config: FetcherConfig,
    state: ProgressState,
    phase: FetchPhase,
    last_save: Instant,
}

impl CollectionFetcher {
    /// Create a fetcher. With `config.resume` set, persisted state for the
    /// configured owner is loaded; a missing, corrupt, or foreign-owner
    /// state file silently falls back to a fresh fetch.
    pub async fn new(client: DiscogsClient, store: StateStore, config: FetcherConfig) -> Self {
        let (state, phase) = if config.resume {
            match store.load(&config.owner).await {
                Some(state) => {
                    info!(
                        owner = %config.owner,
                        fetched = state.fetched_items,
                        total = state.total_items,
                        "resuming from previous state"
                    );
                    (state, FetchPhase::Resuming)
                }
                None => (ProgressState::new(&config.owner, 0), FetchPhase::Fresh),
            }
        } else {
            (ProgressState::new(&config.owner, 0), FetchPhase::Fresh)
        };

        Self {
            client,
            store,
            config,
            state,
            phase,
            last_save: Instant::now(),
        }
    }

    /// Current progress snapshot.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// Progress as a percentage (0-100).
    pub fn progress_percentage(&self) -> f64 {
        self.state.percent_complete()
    }

    /// Fetch every release in the collection.
    ///
    /// See [`Self::fetch_all_with_cancel`]; this variant runs to completion
    /// or failure without external cancellation.
    pub async fn fetch_all(
        &mut self,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<Vec<Release>> {
        self.fetch_all_with_cancel(progress, CancellationToken::new())
            .await
    }

    /// Fetch every release in the collection, with cooperative cancellation.
    ///
    /// Page 1 establishes the item total, persisted state is created or
    /// refreshed for this owner, and the remaining pages stream in with
    /// bounded concurrency. After every record the callback fires and state
    /// is persisted when either the item-count or elapsed-time trigger is
    /// due. State is flushed once more unconditionally on completion, on
    /// fatal error, and on cancellation, so a resumed run loses at most one
    /// save interval of progress.
    pub async fn fetch_all_with_cancel(
        &mut self,
        progress: Option<ProgressCallback<'_>>,
        cancel: CancellationToken,
    ) -> Result<Vec<Release>> {
        info!(owner = %self.config.owner, "fetching collection");
        self.phase = FetchPhase::Fetching;

        match self.drive_full(progress, &cancel).await {
            Ok(releases) => {
                if let Err(flush_err) =
                    flush(&self.store, &mut self.state, &mut self.last_save).await
                {
                    self.phase = FetchPhase::Failed;
                    error!(error = %flush_err, "final state flush failed");
                    return Err(flush_err);
                }
                self.phase = FetchPhase::Complete;
                info!(count = releases.len(), "collection fetch complete");
                Ok(releases)
            }
            Err(e) => {
                self.phase = FetchPhase::Failed;
                error!(error = %e, "collection fetch failed");
                // The fetch error is the one the caller needs; a flush
                // failure on this path is logged, not propagated over it.
                if let Err(flush_err) =
                    flush(&self.store, &mut self.state, &mut self.last_save).await
                {
                    error!(error = %flush_err, "state flush failed while handling fetch error");
                }
                Err(e)
            }
        }
    }

    /// Fetch only the releases not yet counted by persisted progress.
    pub async fn fetch_incremental(
        &mut self,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<Vec<Release>> {
        self.fetch_incremental_with_cancel(progress, CancellationToken::new())
            .await
    }

    /// Fetch only new releases, with cooperative cancellation.
    ///
    /// The API offers no server-side resume cursor, so this re-traverses
    /// from page 1 and discards the first `fetched_items` records: O(n)
    /// re-work on every resume, re-spending request budget on pages already
    /// seen. Only the newly observed tail is returned. Returns empty
    /// without any requests when progress is already complete.
    pub async fn fetch_incremental_with_cancel(
        &mut self,
        progress: Option<ProgressCallback<'_>>,
        cancel: CancellationToken,
    ) -> Result<Vec<Release>> {
        info!(
            owner = %self.config.owner,
            fetched = self.state.fetched_items,
            total = self.state.total_items,
            "fetching incremental updates"
        );

        if self.state.is_complete() {
            info!("collection already fully fetched");
            return Ok(Vec::new());
        }

        self.phase = FetchPhase::Fetching;
        match self.drive_incremental(progress, &cancel).await {
            Ok(new_releases) => {
                if let Err(flush_err) =
                    flush(&self.store, &mut self.state, &mut self.last_save).await
                {
                    self.phase = FetchPhase::Failed;
                    error!(error = %flush_err, "final state flush failed");
                    return Err(flush_err);
                }
                self.phase = FetchPhase::Complete;
                info!(count = new_releases.len(), "incremental fetch complete");
                Ok(new_releases)
            }
            Err(e) => {
                self.phase = FetchPhase::Failed;
                error!(error = %e, "incremental fetch failed");
                if let Err(flush_err) =
                    flush(&self.store, &mut self.state, &mut self.last_save).await
                {
                    error!(error = %flush_err, "state flush failed while handling fetch error");
                }
                Err(e)
            }
        }
    }

    /// Delete persisted state for this owner. In-memory results already
    /// returned to the caller are unaffected.
    pub async fn clear_state(&self) -> Result<bool> {
        let cleared = self.store.clear(&self.config.owner).await?;
        info!(owner = %self.config.owner, cleared, "progress state cleared");
        Ok(cleared)
    }

    async fn drive_full(
        &mut self,
        mut progress: Option<ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Release>> {
        let Self {
            client,
            store,
            config,
            state,
            last_save,
            ..
        } = self;

        // Page 1 establishes the item total before anything streams.
        let first = client.collection_page(1, config.per_page).await?;
        let total_items = first.pagination.items;
        *state = store.get_or_create(&config.owner, total_items).await?;
        info!(total_items, "collection inventory");

        let mut releases: Vec<Release> =
            Vec::with_capacity(usize::try_from(total_items).unwrap_or(0).min(100_000));

        let stream = client.stream_collection(config.per_page, config.max_concurrent);
        futures::pin_mut!(stream);

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => {
                    warn!("cancellation requested, stopping fetch");
                    return Err(Error::Cancelled);
                }
                next = stream.next() => next,
            };
            let Some(result) = next else { break };
            let release = result?;

            releases.push(release);
            state.fetched_items = releases.len() as u64;
            if state.fetched_items > state.total_items {
                // More records than page 1 promised; trust what arrived.
                state.total_items = state.fetched_items;
            }

            if let Some(callback) = progress.as_mut() {
                callback(state.fetched_items, state.total_items);
            }

            if should_save(config, state, *last_save) {
                flush(store, state, last_save).await?;
            }
        }

        Ok(releases)
    }

    async fn drive_incremental(
        &mut self,
        mut progress: Option<ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Release>> {
        let Self {
            client,
            store,
            config,
            state,
            last_save,
            ..
        } = self;

        // Refresh the total first; the collection may have changed since
        // the interrupted run this is resuming.
        let first = client.collection_page(1, config.per_page).await?;
        *state = store.get_or_create(&config.owner, first.pagination.items).await?;

        let skip = state.fetched_items;
        debug!(skip, "re-traversing and discarding already-counted records");

        let mut new_releases = Vec::new();
        let mut seen = 0u64;

        let stream = paginate(client, config.per_page, 1);
        futures::pin_mut!(stream);

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => {
                    warn!("cancellation requested, stopping fetch");
                    return Err(Error::Cancelled);
                }
                next = stream.next() => next,
            };
            let Some(result) = next else { break };
            let release = result?;

            seen += 1;
            if seen <= skip {
                continue;
            }

            new_releases.push(release);
            state.fetched_items = skip + new_releases.len() as u64;
            if state.fetched_items > state.total_items {
                state.total_items = state.fetched_items;
            }

            if let Some(callback) = progress.as_mut() {
                callback(state.fetched_items, state.total_items);
            }

            if should_save(config, state, *last_save) {
                flush(store, state, last_save).await?;
            }
        }

        Ok(new_releases)
    }
}

/// Fetch an entire collection in one call.
///
/// Builds a default client and fetcher for the credentials, storing
/// progress under `state_dir`.
pub async fn fetch_collection(
    credentials: &Credentials,
    state_dir: impl Into<std::path::PathBuf>,
    resume: bool,
) -> Result<Vec<Release>> {
    let client = DiscogsClient::new(credentials)?;
    let store = StateStore::new(state_dir);
    let config = FetcherConfig::builder(&credentials.username)
        .resume(resume)
        .build();

    let mut fetcher = CollectionFetcher::new(client, store, config).await;
    fetcher.fetch_all(None).await
}

fn should_save(config: &FetcherConfig, state: &ProgressState, last_save: Instant) -> bool {
    (config.save_interval_items > 0 && state.fetched_items % config.save_interval_items == 0)
        || last_save.elapsed() >= config.save_interval
}

async fn flush(
    store: &StateStore,
    state: &mut ProgressState,
    last_save: &mut Instant,
) -> Result<()> {
    state.touch();
    store.save(state).await?;
    *last_save = Instant::now();
    Ok(())
}

#[cfg(test)]
mod save_trigger_tests {
    use std::time::Duration;

    use super::*;

    fn state_with(fetched: u64) -> ProgressState {
        let mut state = ProgressState::new("buntstift", 1000);
        state.fetched_items = fetched;
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_interval_triggers_on_multiples() {
        let config = FetcherConfig::builder("buntstift")
            .save_interval_items(50)
            .save_interval(Duration::from_secs(3600))
            .build();
        let now = Instant::now();

        assert!(should_save(&config, &state_with(50), now));
        assert!(should_save(&config, &state_with(100), now));
        assert!(!should_save(&config, &state_with(49), now));
        assert!(!should_save(&config, &state_with(51), now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_interval_triggers_whichever_first() {
        let config = FetcherConfig::builder("buntstift")
            .save_interval_items(50)
            .save_interval(Duration::from_secs(30))
            .build();

        let last_save = Instant::now();
        assert!(!should_save(&config, &state_with(7), last_save));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(should_save(&config, &state_with(7), last_save));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_item_interval_disables_item_trigger() {
        let config = FetcherConfig::builder("buntstift")
            .save_interval_items(0)
            .save_interval(Duration::from_secs(3600))
            .build();
        let now = Instant::now();

        assert!(!should_save(&config, &state_with(50), now));
    }
}
