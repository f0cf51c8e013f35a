// src/github/rate_limit.rs
// =============================================================================
// Tracks the GitHub rate-limit budget shared by every concurrent request.
//
// GitHub reports the budget on every response:
//   x-ratelimit-remaining: requests left in the current window
//   x-ratelimit-reset:     unix timestamp at which the window resets
//
// Responses can arrive out of order when many requests are in flight, so
// within one window we keep the lowest "remaining" we have seen. Once the
// budget is known to be exhausted, requests fail fast instead of hitting
// GitHub just to be refused.
// =============================================================================

use std::sync::{Mutex, PoisonError};

use reqwest::header::HeaderMap;

use crate::error::FetchError;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Budget state as last reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining: u64,
    pub reset: u64,
}

impl RateLimitSnapshot {
    /// Reads the rate-limit headers of a response, if both are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Self {
            remaining: header_u64(headers, REMAINING_HEADER)?,
            reset: header_u64(headers, RESET_HEADER)?,
        })
    }
}

/// Rate-limit budget shared (through an `Arc`) by all users of one token.
#[derive(Debug, Default)]
pub struct RateLimitBudget {
    state: Mutex<Option<RateLimitSnapshot>>,
}

impl RateLimitBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RateLimitSnapshot> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the budget reported by a response.
    pub fn record(&self, headers: &HeaderMap) {
        if let Some(snapshot) = RateLimitSnapshot::from_headers(headers) {
            self.update(snapshot);
        }
    }

    pub fn update(&self, snapshot: RateLimitSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = Some(match *state {
            // Same window: a late response must not raise the count again
            Some(old) if old.reset == snapshot.reset => RateLimitSnapshot {
                remaining: old.remaining.min(snapshot.remaining),
                reset: old.reset,
            },
            Some(old) if old.reset > snapshot.reset => old,
            _ => snapshot,
        });
    }

    /// Fails with `RateLimited` when the budget is exhausted and the
    /// window has not reset yet (`now` is a unix timestamp).
    pub fn check(&self, now: u64) -> Result<(), FetchError> {
        match self.current() {
            Some(snapshot) if snapshot.remaining == 0 && snapshot.reset > now => {
                Err(FetchError::RateLimited {
                    status: 403,
                    reset: Some(snapshot.reset),
                    retry_after: None,
                })
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
