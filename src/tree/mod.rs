// src/tree/mod.rs
// =============================================================================
// Builds the in-memory snapshot of a repository.
//
// Submodules:
// - node: the TreeNode / Snapshot types and their JSON shape
// - decode: base64 payload -> text
// - fetch: the walker that drives the Content API
// =============================================================================

mod decode;
mod fetch;
mod node;

pub use decode::{decode_base64_text, file_content};
pub use fetch::{fetch_tree, FetchOptions, TreeFetcher, DEFAULT_CONCURRENCY};
pub use node::{FetchReport, FileContent, Snapshot, TreeNode};
