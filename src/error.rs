//! Error types for discogs-sync
//!
//! One closed taxonomy for the whole crate. Every variant answers the
//! question a caller actually asks, namely whether the operation can be
//! retried,
//! from the type alone, via [`Error::is_retryable`].

use thiserror::Error;

/// The main error type for discogs-sync
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // API Errors (classified from HTTP status)
    // ============================================================================
    /// Credentials rejected (HTTP 401). Fatal; the user must re-authenticate.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Resource does not exist or is private (HTTP 404). Fatal for that resource.
    #[error("resource not found: {message}")]
    NotFound { message: String },

    /// Server-side throttle (HTTP 429). Transient; honor `retry_after` if present.
    #[error("rate limit exceeded{}", .retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimitExceeded { retry_after: Option<u64> },

    /// Upstream failure (HTTP 5xx). Transient.
    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    /// Any other non-2xx status the classification table doesn't name.
    #[error("unexpected API response: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport failure or timeout, wrapping the underlying cause. Transient.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body received but doesn't parse into the expected schema. Fatal for
    /// that response; usually means the API drifted.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    // ============================================================================
    // Pagination Errors
    // ============================================================================
    /// Pagination metadata changed between pages of one fetch: the remote
    /// collection mutated mid-traversal. Fatal.
    #[error("pagination inconsistency: {message}")]
    PaginationConsistency { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    /// Progress persistence failed. Never swallowed; a failed flush propagates.
    #[error("state error: {message}")]
    State { message: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Invalid parameter passed to a constructor or fetch call.
    #[error("configuration error: {message}")]
    Config { message: String },

    // ============================================================================
    // Cancellation
    // ============================================================================
    /// Fetch was cancelled cooperatively. State has been flushed best-effort.
    #[error("fetch cancelled")]
    Cancelled,
}

impl Error {
    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a generic API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid-response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a pagination-consistency error
    pub fn pagination(message: impl Into<String>) -> Self {
        Self::PaginationConsistency {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether a caller-side retry policy may reasonably re-attempt the
    /// operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimitExceeded { .. } | Error::Server { .. } | Error::Network(_)
        )
    }

    /// Whether this error must abort the fetch (the complement of
    /// [`Error::is_retryable`]).
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }

    /// HTTP status this error was classified from, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Authentication { .. } => Some(401),
            Error::NotFound { .. } => Some(404),
            Error::RateLimitExceeded { .. } => Some(429),
            Error::Server { status } | Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for discogs-sync
pub type Result<T> = std::result::Result<T, Error>;
