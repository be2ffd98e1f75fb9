/*!
 * Error types for the transdeck engine.
 *
 * This module contains custom error types for different parts of the engine,
 * using the thiserror crate for ergonomic error definitions. Provider and
 * translation errors carry a retryability classification consumed by the
 * retry wrapper.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a retry attempt could plausibly succeed.
    ///
    /// Network failures, server errors (5xx) and rate-limit responses are
    /// transient. Authentication failures and other client errors (4xx) are
    /// permanent and short-circuit retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) => true,
            Self::ParseError(_) => true,
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors that can occur while the cache store is being read or written.
///
/// These never abort a translation: the cache fails open and a store error
/// is downgraded to a miss by the caller.
#[derive(Error, Debug)]
pub enum CacheStoreError {
    /// The backing store could not be reached or refused the operation
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during translation of a single sub-batch
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The response parsed but fragment markers were missing or unusable,
    /// so translated text cannot be matched back to fragment ids
    #[error("Response is missing fragment markers: {0}")]
    MissingMarkers(String),

    /// The response contained markers but fewer translated fragments than
    /// were requested
    #[error("Incomplete response: expected {expected} fragments, found {found}")]
    IncompleteResponse {
        /// Number of fragments sent in the sub-batch
        expected: usize,
        /// Number of fragments found in the response
        found: usize,
    },
}

impl TranslationError {
    /// Whether the failed sub-batch is eligible for another attempt.
    ///
    /// Marker and completeness failures arrive with an HTTP 200 but are
    /// treated like transient provider failures: a fresh generation may
    /// well produce a well-formed response.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::MissingMarkers(_) | Self::IncompleteResponse { .. } => true,
        }
    }
}

/// Request-level errors raised by the translation engine.
///
/// Everything below request level degrades to the fallback policy instead
/// of surfacing here; the engine only raises for configuration problems and
/// inputs it cannot meaningfully process at all.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Fatal configuration problem, surfaced before any dispatch
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request itself is malformed (e.g. duplicate fragment ids)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
