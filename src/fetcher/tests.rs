//! Tests for the collection fetcher

use std::collections::HashSet;

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::api::{ClientConfig, DiscogsClient};
use crate::credentials::Credentials;
use crate::error::Error;
use crate::state::{ProgressState, StateStore};

const COLLECTION_PATH: &str = "/users/buntstift/collection/folders/0/releases";

fn test_client(server: &MockServer) -> DiscogsClient {
    let config = ClientConfig::builder().base_url(server.uri()).build();
    DiscogsClient::with_config(&Credentials::new("buntstift", "test-token"), config).unwrap()
}

fn release_json(id: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "instance_id": id,
        "date_added": "2024-03-01T12:00:00Z",
        "rating": 0,
        "basic_information": {
            "id": id,
            "title": format!("Release {id}"),
            "year": 1991,
            "artists": [],
            "labels": [],
            "formats": [],
            "thumb": "",
            "cover_image": ""
        }
    })
}

async fn mount_page(
    server: &MockServer,
    page: u32,
    pages: u32,
    per_page: u32,
    items: u64,
    ids: impl IntoIterator<Item = i64>,
) {
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pagination": {"page": page, "pages": pages, "per_page": per_page, "items": items},
            "releases": ids.into_iter().map(release_json).collect::<Vec<_>>()
        })))
        .mount(server)
        .await;
}

/// Mounts a reference collection: 250 items in 3 pages of 100.
async fn mount_reference_collection(server: &MockServer) {
    mount_page(server, 1, 3, 100, 250, 1..=100).await;
    mount_page(server, 2, 3, 100, 250, 101..=200).await;
    mount_page(server, 3, 3, 100, 250, 201..=250).await;
}

async fn test_fetcher(server: &MockServer, store: StateStore, resume: bool) -> CollectionFetcher {
    let config = FetcherConfig::builder("buntstift")
        .per_page(100)
        .max_concurrent(3)
        .resume(resume)
        .build();
    CollectionFetcher::new(test_client(server), store, config).await
}

#[tokio::test]
async fn test_fetch_all_returns_every_record() {
    let server = MockServer::start().await;
    mount_reference_collection(&server).await;
    let dir = tempdir().unwrap();

    let mut fetcher = test_fetcher(&server, StateStore::new(dir.path()), false).await;
    assert_eq!(fetcher.phase(), FetchPhase::Fresh);

    let releases = fetcher.fetch_all(None).await.unwrap();

    assert_eq!(releases.len(), 250);
    let ids: HashSet<i64> = releases.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 250);
    assert_eq!(fetcher.phase(), FetchPhase::Complete);
    assert_eq!(fetcher.state().fetched_items, 250);
    assert_eq!(fetcher.state().total_items, 250);
    assert_eq!(fetcher.progress_percentage(), 100.0);
}

#[tokio::test]
async fn test_fetch_all_progress_callback_cadence() {
    let server = MockServer::start().await;
    mount_reference_collection(&server).await;
    let dir = tempdir().unwrap();

    let mut fetcher = test_fetcher(&server, StateStore::new(dir.path()), false).await;

    let mut calls: Vec<(u64, u64)> = Vec::new();
    fetcher
        .fetch_all(Some(Box::new(|current, total| {
            calls.push((current, total));
        })))
        .await
        .unwrap();

    // Exactly once per record, strictly increasing, against a constant total.
    assert_eq!(calls.len(), 250);
    assert!(calls.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(calls.iter().all(|(_, total)| *total == 250));
    assert_eq!(calls.first(), Some(&(1, 250)));
    assert_eq!(calls.last(), Some(&(250, 250)));
}

#[tokio::test]
async fn test_fetch_all_persists_final_state() {
    let server = MockServer::start().await;
    mount_reference_collection(&server).await;
    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut fetcher = test_fetcher(&server, store.clone(), false).await;
    fetcher.fetch_all(None).await.unwrap();

    let persisted = store.load("buntstift").await.unwrap();
    assert_eq!(persisted.fetched_items, 250);
    assert_eq!(persisted.total_items, 250);
    assert!(persisted.is_complete());
}

#[tokio::test]
async fn test_fetch_all_flushes_state_before_fatal_error() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 3, 100, 250, 1..=100).await;
    mount_page(&server, 2, 3, 100, 250, 101..=200).await;
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    // Sequential traversal so pages 1 and 2 are counted before page 3 fails.
    let config = FetcherConfig::builder("buntstift")
        .per_page(100)
        .max_concurrent(1)
        .build();
    let mut fetcher = CollectionFetcher::new(test_client(&server), store.clone(), config).await;

    let err = fetcher.fetch_all(None).await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 500 }));
    assert!(err.is_retryable());
    assert_eq!(fetcher.phase(), FetchPhase::Failed);

    let persisted = store.load("buntstift").await.unwrap();
    assert_eq!(persisted.fetched_items, 200);
    assert_eq!(persisted.total_items, 250);
}

#[tokio::test]
async fn test_crash_then_incremental_resume_yields_full_set() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 3, 100, 250, 1..=100).await;
    mount_page(&server, 2, 3, 100, 250, 101..=200).await;

    // Page 3 fails during the first run.
    let failing = Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(503))
        .mount_as_scoped(&server)
        .await;

    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let config = FetcherConfig::builder("buntstift")
        .per_page(100)
        .max_concurrent(1)
        .build();
    let mut fetcher = CollectionFetcher::new(test_client(&server), store.clone(), config).await;

    let err = fetcher.fetch_all(None).await.unwrap_err();
    assert!(err.is_retryable());
    let first_run_ids: HashSet<i64> = (1..=200).collect();

    // Page 3 recovers; a fresh fetcher resumes from persisted progress.
    drop(failing);
    mount_page(&server, 3, 3, 100, 250, 201..=250).await;

    let mut resumed = test_fetcher(&server, store.clone(), true).await;
    assert_eq!(resumed.phase(), FetchPhase::Resuming);

    let mut calls: Vec<(u64, u64)> = Vec::new();
    let tail = resumed
        .fetch_incremental(Some(Box::new(|current, total| {
            calls.push((current, total));
        })))
        .await
        .unwrap();

    // Only the unseen tail comes back, and the combined id-set matches an
    // uninterrupted fetch.
    assert_eq!(tail.len(), 50);
    let tail_ids: HashSet<i64> = tail.iter().map(|r| r.id).collect();
    let combined: HashSet<i64> = first_run_ids.union(&tail_ids).copied().collect();
    assert_eq!(combined, (1..=250).collect::<HashSet<i64>>());

    // Progress resumes counting where the crash left off.
    assert_eq!(calls.first(), Some(&(201, 250)));
    assert_eq!(calls.last(), Some(&(250, 250)));
    assert_eq!(resumed.phase(), FetchPhase::Complete);
    assert!(resumed.state().is_complete());
}

#[tokio::test]
async fn test_fetch_incremental_noops_when_complete() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut complete = ProgressState::new("buntstift", 250);
    complete.fetched_items = 250;
    store.save(&complete).await.unwrap();

    // No mocks are mounted: any request would fail the test with a 404.
    let mut fetcher = test_fetcher(&server, store, true).await;
    let releases = fetcher.fetch_incremental(None).await.unwrap();
    assert!(releases.is_empty());
}

#[tokio::test]
async fn test_resume_ignores_foreign_owner_state() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut foreign = ProgressState::new("someone-else", 10);
    foreign.fetched_items = 5;
    store.save(&foreign).await.unwrap();

    let fetcher = test_fetcher(&server, store, true).await;
    assert_eq!(fetcher.phase(), FetchPhase::Fresh);
    assert_eq!(fetcher.state().fetched_items, 0);
}

#[tokio::test]
async fn test_fetch_all_refreshes_stale_resumed_total() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 1, 100, 3, 1..=3).await;

    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut stale = ProgressState::new("buntstift", 100);
    stale.fetched_items = 40;
    store.save(&stale).await.unwrap();

    let mut fetcher = test_fetcher(&server, store.clone(), true).await;
    assert_eq!(fetcher.phase(), FetchPhase::Resuming);

    let releases = fetcher.fetch_all(None).await.unwrap();
    assert_eq!(releases.len(), 3);
    assert_eq!(fetcher.state().total_items, 3);
    assert_eq!(fetcher.state().fetched_items, 3);

    let persisted = store.load("buntstift").await.unwrap();
    assert_eq!(persisted.total_items, 3);
}

#[tokio::test]
async fn test_cancellation_flushes_state_and_reports_cancelled() {
    let server = MockServer::start().await;
    mount_reference_collection(&server).await;

    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());
    let mut fetcher = test_fetcher(&server, store.clone(), false).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fetcher
        .fetch_all_with_cancel(None, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(err.is_fatal());
    assert_eq!(fetcher.phase(), FetchPhase::Failed);

    // Totals were learned from page 1 and flushed before returning.
    let persisted = store.load("buntstift").await.unwrap();
    assert_eq!(persisted.total_items, 250);
}

#[tokio::test]
async fn test_clear_state() {
    let server = MockServer::start().await;
    mount_reference_collection(&server).await;
    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut fetcher = test_fetcher(&server, store.clone(), false).await;
    fetcher.fetch_all(None).await.unwrap();
    assert!(store.exists("buntstift").await);

    assert!(fetcher.clear_state().await.unwrap());
    assert!(!store.exists("buntstift").await);
    assert!(!fetcher.clear_state().await.unwrap());
}

#[tokio::test]
async fn test_incremental_failure_preserves_resumed_progress() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, 100, 150, 1..=100).await;
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut prior = ProgressState::new("buntstift", 150);
    prior.fetched_items = 100;
    store.save(&prior).await.unwrap();

    let mut fetcher = test_fetcher(&server, store.clone(), true).await;
    let err = fetcher.fetch_incremental(None).await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 502 }));
    assert_eq!(fetcher.phase(), FetchPhase::Failed);

    // Nothing new arrived, so the flushed state still reads 100/150.
    let persisted = store.load("buntstift").await.unwrap();
    assert_eq!(persisted.fetched_items, 100);
    assert_eq!(persisted.total_items, 150);
}
