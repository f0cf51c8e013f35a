// src/tree/node.rs
// =============================================================================
// The materialized repository snapshot.
//
// A snapshot is a tree of TreeNode values. Each node is exactly one of:
//   - Dir:  has children, in the order the API listed them
//   - File: has content, which is decoded text or a sentinel
//
// JSON shape (what the web frontend expects):
//   {"name": "src", "path": "src", "type": "dir", "children": [...]}
//   {"name": "a.rs", "path": "src/a.rs", "type": "file", "content": "..."}
// Sentinels render as their bracketed text so `content` is always a string.
// =============================================================================

use std::fmt;

use serde::{Serialize, Serializer};

use crate::github::RepositoryIdentifier;

/// Content of a file node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Decoded file text
    Text(String),
    /// A single-file fetch came back without any payload
    NoContent,
    /// A file inside a listing had no inlined payload (binary or too large)
    NotInlined,
    /// Fetching this file failed; holds the reason
    FetchFailed(String),
}

impl fmt::Display for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileContent::Text(text) => f.write_str(text),
            FileContent::NoContent => f.write_str("[No content]"),
            FileContent::NotInlined => f.write_str("[Non-text or too large to fetch directly]"),
            FileContent::FetchFailed(reason) => write!(f, "[Error fetching content: {}]", reason),
        }
    }
}

impl Serialize for FileContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FileContent::Text(text) => serializer.serialize_str(text),
            sentinel => serializer.collect_str(sentinel),
        }
    }
}

/// One entry of a fetched repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Dir {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        path: String,
        content: FileContent,
        /// Why the content is missing, for failed fetches
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl TreeNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>, content: FileContent) -> Self {
        let error = match &content {
            FileContent::FetchFailed(reason) => Some(reason.clone()),
            _ => None,
        };
        TreeNode::File {
            name: name.into(),
            path: path.into(),
            content,
            error,
        }
    }

    pub fn dir(name: impl Into<String>, path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        TreeNode::Dir {
            name: name.into(),
            path: path.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Dir { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeNode::Dir { path, .. } | TreeNode::File { path, .. } => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Dir { .. })
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Dir { children, .. } => children,
            TreeNode::File { .. } => &[],
        }
    }

    pub fn content(&self) -> Option<&FileContent> {
        match self {
            TreeNode::File { content, .. } => Some(content),
            TreeNode::Dir { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TreeNode::File { error, .. } => error.as_deref(),
            TreeNode::Dir { .. } => None,
        }
    }
}

/// Result of fetching one path: a directory's children or a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    Listing(Vec<TreeNode>),
    File(TreeNode),
}

impl Snapshot {
    /// Top-level nodes of the snapshot.
    pub fn nodes(&self) -> &[TreeNode] {
        match self {
            Snapshot::Listing(nodes) => nodes,
            Snapshot::File(node) => std::slice::from_ref(node),
        }
    }

    /// Counts (files, directories) across the whole snapshot.
    pub fn counts(&self) -> (usize, usize) {
        let mut stack: Vec<&TreeNode> = self.nodes().iter().collect();
        let (mut files, mut dirs) = (0, 0);

        while let Some(node) = stack.pop() {
            if node.is_dir() {
                dirs += 1;
                stack.extend(node.children());
            } else {
                files += 1;
            }
        }
        (files, dirs)
    }
}

/// The document handed back to callers: `{owner, repo, contents}`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub owner: String,
    pub repo: String,
    pub contents: Snapshot,
}

impl FetchReport {
    pub fn new(repo: &RepositoryIdentifier, contents: Snapshot) -> Self {
        Self {
            owner: repo.owner().to_string(),
            repo: repo.name().to_string(),
            contents,
        }
    }
}
