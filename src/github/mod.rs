// src/github/mod.rs
// =============================================================================
// This module talks to GitHub.
//
// Currently implements:
// - Parsing GitHub URLs to extract owner/repo
// - The Contents API wire types (listings and single files)
// - A reqwest-based client with retries and a shared rate-limit budget
//
// Rust concepts:
// - Modules: Organizing related functionality
// - Traits: ContentApi lets the fetcher work with any content source
// =============================================================================

mod client;
mod content;
mod identifier;
mod rate_limit;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{
    ContentApi, GitHubClient, GitHubClientBuilder, DEFAULT_API_URL, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT,
};
pub use content::{ContentEntry, ContentResponse, EntryKind, FileMetadata};
pub use identifier::{parse_identifier, RepositoryIdentifier};
pub use rate_limit::{RateLimitBudget, RateLimitSnapshot};
