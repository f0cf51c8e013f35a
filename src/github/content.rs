// src/github/content.rs
// =============================================================================
// Wire types for the GitHub Contents API.
//
// GET /repos/{owner}/{repo}/contents/{path} returns either:
//   - a JSON array when `path` is a directory (one object per entry), or
//   - a single JSON object when `path` is a file, with base64 content.
//
// Listing entries never carry file content, so every file needs a second
// request to the same endpoint with its own path.
// =============================================================================

use serde::Deserialize;

/// Kind of an entry in a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    /// Anything GitHub adds later; fetched like a file
    #[serde(other)]
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    /// Path relative to the repository root
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl ContentEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// A single file as returned by the Contents API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub path: String,
    /// Base64 payload; empty or absent for files too large to inline
    #[serde(default)]
    pub content: Option<String>,
    /// "base64" normally, "none" when the file is too large
    #[serde(default)]
    pub encoding: Option<String>,
}

impl FileMetadata {
    /// The base64 payload, if GitHub actually inlined one.
    pub fn payload(&self) -> Option<&str> {
        let content = self.content.as_deref().filter(|c| !c.is_empty())?;
        match self.encoding.as_deref() {
            None | Some("base64") => Some(content),
            Some(_) => None,
        }
    }
}

/// Response of one Contents API call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Listing(Vec<ContentEntry>),
    File(FileMetadata),
}

/// Error body GitHub sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub message: String,
}
