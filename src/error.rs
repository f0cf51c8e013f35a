// src/error.rs
// =============================================================================
// Error type shared by the GitHub client and the tree fetcher.
//
// Every fetch operation returns Result<_, FetchError>. The fetcher decides
// per entry whether an error is fatal (directory listings) or gets embedded
// into the tree as data (individual files).
// =============================================================================

use std::time::Duration;

use thiserror::Error;

/// Shown to users when GitHub refuses a request because of rate limiting.
pub const RATE_LIMIT_MESSAGE: &str =
    "GitHub API Rate limit exceeded. Please add a GITHUB_TOKEN to .env";

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connect, TLS, per-request timeout)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The requested path does not exist (HTTP 404)
    #[error("{path} not found")]
    NotFound { path: String },

    /// HTTP 429, or HTTP 403 caused by an exhausted rate-limit budget
    #[error("GitHub API rate limit exceeded (HTTP {status})")]
    RateLimited {
        status: u16,
        /// Unix timestamp at which the budget resets, if GitHub told us
        reset: Option<u64>,
        /// Seconds to wait before retrying (secondary rate limits)
        retry_after: Option<u64>,
    },

    /// Any other non-2xx response
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("unexpected response for {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    /// The overall fetch deadline elapsed
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// HTTP-like status code for this failure, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::NotFound { .. } => Some(404),
            FetchError::RateLimited { status, .. } | FetchError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    /// Message suitable for showing to whoever asked for the fetch.
    ///
    /// Rate limits get a hint about configuring a token; everything else
    /// is the plain error text.
    pub fn user_message(&self) -> String {
        if self.is_rate_limit() {
            RATE_LIMIT_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}
