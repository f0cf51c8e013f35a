// In-memory ContentApi used by the fetcher tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};

use super::client::ContentApi;
use super::content::{ContentEntry, ContentResponse, EntryKind, FileMetadata};
use super::identifier::RepositoryIdentifier;
use crate::error::FetchError;

enum Reply {
    Listing(Vec<ContentEntry>),
    File(Option<String>),
    Status(u16),
}

/// A scripted repository. Unknown paths answer 404.
#[derive(Default)]
pub struct FakeContentApi {
    replies: HashMap<String, Reply>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

impl FakeContentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory at `path` listing `entries` (paths; a trailing `/` marks a dir).
    pub fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        let entries = entries
            .iter()
            .map(|entry| {
                let (entry_path, kind) = match entry.strip_suffix('/') {
                    Some(dir) => (dir, EntryKind::Dir),
                    None => (*entry, EntryKind::File),
                };
                ContentEntry {
                    name: base_name(entry_path),
                    path: entry_path.to_string(),
                    kind,
                }
            })
            .collect();
        self.replies.insert(path.to_string(), Reply::Listing(entries));
        self
    }

    /// File at `path` whose payload is `text` encoded as base64.
    pub fn file(mut self, path: &str, text: &str) -> Self {
        let payload = Base64::encode_string(text.as_bytes());
        self.replies.insert(path.to_string(), Reply::File(Some(payload)));
        self
    }

    /// File at `path` without an inlined payload.
    pub fn file_without_content(mut self, path: &str) -> Self {
        self.replies.insert(path.to_string(), Reply::File(None));
        self
    }

    pub fn raw_file(mut self, path: &str, payload: &str) -> Self {
        self.replies.insert(path.to_string(), Reply::File(Some(payload.to_string())));
        self
    }

    pub fn status(mut self, path: &str, status: u16) -> Self {
        self.replies.insert(path.to_string(), Reply::Status(status));
        self
    }

    pub fn delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentApi for FakeContentApi {
    async fn get_content(
        &self,
        _repo: &RepositoryIdentifier,
        path: &str,
    ) -> Result<ContentResponse, FetchError> {
        self.calls.lock().unwrap().push(path.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.get(path) {
            Some(Reply::Listing(entries)) => Ok(ContentResponse::Listing(entries.clone())),
            Some(Reply::File(payload)) => Ok(ContentResponse::File(FileMetadata {
                name: base_name(path),
                path: path.to_string(),
                content: payload.clone(),
                encoding: payload.as_ref().map(|_| "base64".to_string()),
            })),
            Some(Reply::Status(403)) => Err(FetchError::RateLimited {
                status: 403,
                reset: None,
                retry_after: None,
            }),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            None => Err(FetchError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}
