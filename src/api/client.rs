//! Typed Discogs API transport
//!
//! Builds authenticated requests, classifies responses by HTTP status into
//! the crate error taxonomy, and decodes payloads into wire models. Every
//! outbound call first passes through the rate limiter. The client never
//! retries; transient errors carry enough context for a caller-side policy.

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::models::{CollectionPage, CollectionValue, Pagination, Release};
use super::rate_limit::{RateLimitConfig, RateLimiter};
use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Discogs caps `per_page` at 100; larger requests are silently clamped
/// server-side, so clamp client-side and keep the math honest.
pub const MAX_PER_PAGE: u32 = 100;

const ACCEPT_MEDIA_TYPE: &str = "application/vnd.discogs.v2.plaintext+json";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for all requests
    pub base_url: String,
    /// User-Agent header (required by Discogs)
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Token bucket parameters
    pub rate_limit: RateLimitConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.discogs.com".to_string(),
            user_agent: format!("discogs-sync/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the rate limit parameters
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Async client for the Discogs API v2
pub struct DiscogsClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    rate_limiter: RateLimiter,
}

impl DiscogsClient {
    /// Create a client for the given credentials with default configuration.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(credentials: &Credentials, config: ClientConfig) -> Result<Self> {
        let base_url = url::Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid base URL '{}': {e}", config.base_url)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Discogs token={}", credentials.token))
            .map_err(|_| Error::config("API token contains characters invalid in a header"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPE));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        info!(username = %credentials.username, "Discogs client initialized");

        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            username: credentials.username.clone(),
            rate_limiter: RateLimiter::new(config.rate_limit),
        })
    }

    /// Username this client's requests are scoped to.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The client's rate limiter (monitoring only).
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Fetch a single page of collection releases.
    ///
    /// `page` is 1-indexed; `per_page` is clamped to [`MAX_PER_PAGE`].
    pub async fn collection_page(&self, page: u32, per_page: u32) -> Result<CollectionPage> {
        let path = format!("/users/{}/collection/folders/0/releases", self.username);
        let query = [
            ("page", page.to_string()),
            ("per_page", per_page.clamp(1, MAX_PER_PAGE).to_string()),
        ];

        let collection_page: CollectionPage = self.get_json(&path, &query).await?;
        collection_page.pagination.validate()?;
        Ok(collection_page)
    }

    /// Fetch collection value statistics (min/median/max).
    pub async fn collection_value(&self) -> Result<CollectionValue> {
        let path = format!("/users/{}/collection/value", self.username);
        self.get_json(&path, &[]).await
    }

    /// Probe the API with the configured credentials.
    pub async fn test_connection(&self) -> Result<()> {
        match self.collection_value().await {
            Ok(_) => {
                info!("API connection test successful");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "API connection test failed");
                Err(e)
            }
        }
    }

    /// Stream every release in the collection.
    ///
    /// Page 1 is fetched first to learn the page count and its releases are
    /// yielded in order. Remaining pages are fetched with at most
    /// `max_concurrent` requests in flight, and each page's releases are
    /// yielded as that page completes; within-page order is preserved,
    /// cross-page order is not. Throughput is traded for strict ordering
    /// here; callers that need a stable order sort by `date_added` + id.
    ///
    /// Every later page is checked against page 1's pagination envelope;
    /// a disagreement ends the stream with `PaginationConsistency`.
    pub fn stream_collection(
        &self,
        per_page: u32,
        max_concurrent: usize,
    ) -> impl Stream<Item = Result<Release>> + '_ {
        try_stream! {
            let first = self.collection_page(1, per_page).await?;
            let expected = first.pagination;

            info!(
                items = expected.items,
                pages = expected.pages,
                "collection inventory"
            );

            for release in first.releases {
                yield release;
            }

            if expected.pages <= 1 {
                return;
            }

            // A single worker degenerates to sequential traversal, which
            // also guarantees page-ordered emission.
            if max_concurrent <= 1 {
                for page_number in 2..=expected.pages {
                    let page = self.collection_page(page_number, per_page).await?;
                    check_consistency(&expected, page_number, &page.pagination)?;
                    for release in page.releases {
                        yield release;
                    }
                }
                return;
            }

            let semaphore = Arc::new(Semaphore::new(max_concurrent));
            let mut in_flight = FuturesUnordered::new();
            for page_number in 2..=expected.pages {
                let semaphore = Arc::clone(&semaphore);
                in_flight.push(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    (page_number, self.collection_page(page_number, per_page).await)
                });
            }

            while let Some((page_number, result)) = in_flight.next().await {
                let page = result?;
                check_consistency(&expected, page_number, &page.pagination)?;
                for release in page.releases {
                    yield release;
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let response = self.http.get(&url).query(query).send().await?;
        let response = classify_status(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "response body failed schema decode");
            Error::invalid_response(format!("body does not match expected schema: {e}"))
        })
    }
}

impl std::fmt::Debug for DiscogsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscogsClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Map a response's HTTP status to the error taxonomy, passing 2xx through.
async fn classify_status(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::authentication(
            "invalid API token or insufficient permissions",
        )),
        StatusCode::NOT_FOUND => {
            let url = response.url().clone();
            let body = response.text().await.unwrap_or_default();
            Err(Error::not_found(format!("{url} ({body})")))
        }
        StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimitExceeded {
            retry_after: extract_retry_after(&response),
        }),
        s if s.is_server_error() => Err(Error::Server {
            status: s.as_u16(),
        }),
        s => {
            let body = response.text().await.unwrap_or_default();
            Err(Error::api(s.as_u16(), body))
        }
    }
}

/// Parse the Retry-After header as whole seconds, if present and numeric.
fn extract_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Every page after the first must agree with page 1 on total pages and
/// total items, and must echo the page number it was asked for.
fn check_consistency(first: &Pagination, requested: u32, got: &Pagination) -> Result<()> {
    if got.pages != first.pages || got.items != first.items {
        return Err(Error::pagination(format!(
            "collection changed mid-fetch: expected {} pages / {} items, \
             page {requested} reports {} pages / {} items",
            first.pages, first.items, got.pages, got.items
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
