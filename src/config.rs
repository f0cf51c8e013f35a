// src/config.rs
// =============================================================================
// Runtime configuration for one fetch.
//
// The CLI fills this in from flags and environment variables (GITHUB_TOKEN,
// GITHUB_API_URL, also read from .env). Other frontends can build it directly.
// =============================================================================

use std::time::Duration;

use crate::error::FetchError;
use crate::github::{GitHubClient, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use crate::tree::{FetchOptions, DEFAULT_CONCURRENCY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the GitHub REST API
    pub api_url: String,
    /// Opaque bearer token; without one GitHub allows far fewer requests
    pub token: Option<String>,
    /// Branch, tag or commit; None reads the default branch
    pub git_ref: Option<String>,
    pub concurrency: usize,
    /// Timeout for each individual API call
    pub request_timeout: Duration,
    /// Timeout for the fetch as a whole
    pub deadline: Option<Duration>,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            git_ref: None,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: DEFAULT_TIMEOUT,
            deadline: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Config {
    pub fn client(&self) -> Result<GitHubClient, FetchError> {
        GitHubClient::builder()
            .api_url(&self.api_url)
            .token(self.token.clone())
            .git_ref(self.git_ref.clone())
            .timeout(self.request_timeout)
            .max_retries(self.max_retries)
            .build()
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            concurrency: self.concurrency.max(1),
            deadline: self.deadline,
        }
    }
}
