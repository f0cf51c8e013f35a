// src/lib.rs
// =============================================================================
// repo-snapshot: fetch the full file tree of a GitHub repository.
//
// The two operations other code calls:
//   - github::parse_identifier(url)        -> Option<RepositoryIdentifier>
//   - tree::TreeFetcher::fetch(repo, path) -> Result<Snapshot, FetchError>
//
// The result serializes to JSON as {owner, repo, contents} via FetchReport.
// =============================================================================

pub mod config;
pub mod error;
pub mod github;
pub mod tree;

pub use config::Config;
pub use error::FetchError;
pub use github::{parse_identifier, ContentApi, GitHubClient, RepositoryIdentifier};
pub use tree::{fetch_tree, FetchOptions, FetchReport, FileContent, Snapshot, TreeFetcher, TreeNode};
