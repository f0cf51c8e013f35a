// src/github/client.rs
// =============================================================================
// The Content API client.
//
// `ContentApi` is the seam the tree fetcher depends on: "given a repository
// and a path, return a directory listing or one file". `GitHubClient` is the
// real implementation on top of reqwest and the GitHub REST API; tests swap
// in an in-memory fake.
//
// The client owns three cross-cutting concerns so the fetcher doesn't have to:
//   - per-request timeout (set on the reqwest client)
//   - the shared rate-limit budget
//   - bounded retries for transient failures and secondary rate limits
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use url::Url;

use super::content::{ApiMessage, ContentResponse};
use super::identifier::RepositoryIdentifier;
use super::rate_limit::{header_u64, RateLimitBudget, RateLimitSnapshot};
use crate::error::FetchError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[allow(clippy::declare_interior_mutable_const)]
const GITHUB_JSON_MIME: HeaderValue = HeaderValue::from_static("application/vnd.github+json");
const API_VERSION_HEADER: &str = "x-github-api-version";
#[allow(clippy::declare_interior_mutable_const)]
const API_VERSION: HeaderValue = HeaderValue::from_static("2022-11-28");
const CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Backoff before the first retry, doubled on every further attempt.
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Longest Retry-After we are willing to sleep through before retrying.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Source of repository contents.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Lists the directory at `path`, or returns the file at `path`.
    ///
    /// An empty `path` means the repository root.
    async fn get_content(
        &self,
        repo: &RepositoryIdentifier,
        path: &str,
    ) -> Result<ContentResponse, FetchError>;
}

#[async_trait]
impl<T: ContentApi + ?Sized> ContentApi for Arc<T> {
    async fn get_content(
        &self,
        repo: &RepositoryIdentifier,
        path: &str,
    ) -> Result<ContentResponse, FetchError> {
        (**self).get_content(repo, path).await
    }
}

/// Builder for [`GitHubClient`].
#[derive(Debug)]
pub struct GitHubClientBuilder {
    api_url: String,
    token: Option<String>,
    git_ref: Option<String>,
    timeout: Duration,
    max_retries: u32,
    budget: Option<Arc<RateLimitBudget>>,
}

impl GitHubClientBuilder {
    /// Base URL of the REST API (GitHub Enterprise, or a local test server).
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Branch, tag or commit to read from instead of the default branch.
    pub fn git_ref(mut self, git_ref: Option<String>) -> Self {
        self.git_ref = git_ref;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Shares a budget with other clients using the same token.
    pub fn budget(mut self, budget: Arc<RateLimitBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn build(self) -> Result<GitHubClient, FetchError> {
        let api_url = Url::parse(&self.api_url)?;
        if api_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, GITHUB_JSON_MIME);
        headers.insert(API_VERSION_HEADER, API_VERSION);
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        // One client for every request so connections get pooled
        let http = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()?;

        Ok(GitHubClient {
            http,
            api_url,
            token: self.token,
            git_ref: self.git_ref,
            max_retries: self.max_retries,
            budget: self.budget.unwrap_or_default(),
        })
    }
}

/// [`ContentApi`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: Url,
    token: Option<String>,
    git_ref: Option<String>,
    max_retries: u32,
    budget: Arc<RateLimitBudget>,
}

impl GitHubClient {
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            git_ref: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            budget: None,
        }
    }

    pub fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        self.budget.current()
    }

    /// Builds `{api}/repos/{owner}/{repo}/contents/{path}[?ref=...]`.
    ///
    /// Every path segment is percent-encoded on its own, so names with
    /// spaces or `#` survive the trip.
    pub fn contents_url(&self, repo: &RepositoryIdentifier, path: &str) -> Result<Url, FetchError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name(), "contents"])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));

        if let Some(git_ref) = &self.git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }
        Ok(url)
    }

    // Sends one request and classifies the response
    async fn send_once(&self, url: Url, path: &str) -> Result<ContentResponse, FetchError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        self.budget.record(response.headers());

        let status = response.status();
        if status.is_success() {
            return response.json::<ContentResponse>().await.map_err(|e| {
                if e.is_decode() {
                    FetchError::UnexpectedResponse {
                        path: path.to_string(),
                        reason: e.to_string(),
                    }
                } else {
                    FetchError::Transport(e)
                }
            });
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());

        Err(classify_failure(status, &headers, message, path))
    }
}

#[async_trait]
impl ContentApi for GitHubClient {
    async fn get_content(
        &self,
        repo: &RepositoryIdentifier,
        path: &str,
    ) -> Result<ContentResponse, FetchError> {
        let url = self.contents_url(repo, path)?;
        let mut attempt = 0;

        loop {
            self.budget.check(unix_now())?;

            let error = match self.send_once(url.clone(), path).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let Some(delay) = retry_delay(&error, attempt).filter(|_| attempt < self.max_retries)
            else {
                return Err(error);
            };

            attempt += 1;
            warn!(
                "[GitHub] {} for '{}', retry {}/{} in {:?}",
                error, path, attempt, self.max_retries, delay
            );
            tokio::time::sleep(delay).await;
            debug!("[GitHub] Retrying '{}'", path);
        }
    }
}

// Maps a non-2xx response to the matching FetchError variant
fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    message: String,
    path: &str,
) -> FetchError {
    let retry_after = header_u64(headers, RETRY_AFTER.as_str());
    let snapshot = RateLimitSnapshot::from_headers(headers);
    let exhausted = snapshot.is_some_and(|s| s.remaining == 0);

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (exhausted
                || retry_after.is_some()
                || message.to_ascii_lowercase().contains("rate limit")));

    if rate_limited {
        return FetchError::RateLimited {
            status: status.as_u16(),
            reset: snapshot.map(|s| s.reset),
            retry_after,
        };
    }

    if status == StatusCode::NOT_FOUND {
        return FetchError::NotFound {
            path: path.to_string(),
        };
    }

    FetchError::Status {
        status: status.as_u16(),
        message,
    }
}

// How long to wait before retrying `error`, or None if it must not be retried
//
// Retried:
//   - secondary rate limits (GitHub sends Retry-After, or HTTP 429); the full
//     Retry-After is honored, and one longer than a minute is not retried
//   - connect errors and per-request timeouts
// Never retried:
//   - an exhausted primary budget (the window can be an hour away)
//   - anything else (404, 5xx, decode errors)
fn retry_delay(error: &FetchError, attempt: u32) -> Option<Duration> {
    match error {
        FetchError::RateLimited {
            retry_after: Some(secs),
            ..
        } => {
            // Retrying before the requested wait is over only earns another refusal
            let wait = Duration::from_secs(*secs);
            (wait <= MAX_RETRY_AFTER).then_some(wait)
        }
        FetchError::RateLimited { status: 429, .. } => Some(backoff(attempt)),
        FetchError::Transport(e) if e.is_timeout() || e.is_connect() => Some(backoff(attempt)),
        _ => None,
    }
}

fn backoff(attempt: u32) -> Duration {
    BASE_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
