// src/github/identifier.rs
// =============================================================================
// Parsing GitHub URLs into an (owner, repo) pair.
//
// Supported formats:
//   - https://github.com/owner/repo
//   - https://github.com/owner/repo.git
//   - http://www.github.com/owner/repo/tree/main/src   (extra segments ignored)
//   - github.com/owner/repo
//   - owner/repo
//
// Other hosts and anything else give None. Callers treat None as "invalid input" rather
// than as an error to propagate.
// =============================================================================

use std::fmt;

use serde::Serialize;

/// The (owner, name) pair that identifies one GitHub repository.
///
/// Built once from user input and then only borrowed by every API call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryIdentifier {
    owner: String,
    name: String,
}

impl RepositoryIdentifier {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// Parses a GitHub URL to extract owner and repository name
//
// Returns: Some(identifier) on success, None for malformed input
//
// Example:
//   "https://github.com/acme/widgets.git" -> Some(acme/widgets)
//   "not-a-url"                           -> None
pub fn parse_identifier(url: &str) -> Option<RepositoryIdentifier> {
    // Remove common prefixes
    let url = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    // The host is optional, "owner/repo" works on its own. Any other host
    // (gitlab.com/...) is rejected: GitHub owners never contain a dot.
    let path = match url.strip_prefix("github.com/") {
        Some(path) => path,
        None if url.split('/').next().is_some_and(|host| host.contains('.')) => return None,
        None => url,
    };

    // Query strings and fragments never carry the owner or repo
    let path = path
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next()?;

    // Remove .git suffix if present
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }

    Some(RepositoryIdentifier::new(owner, repo))
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option instead of Result?
//    - A bad URL is an expected user mistake, not a failure of the program
//    - None tells the caller "invalid input" without any error plumbing
//
// 2. What does the ? do on an Option?
//    - parts.next()? returns None from the function if there is no next part
//    - Same early-return idea as ? on a Result
//
// 3. strip_prefix / strip_suffix vs trim_*_matches
//    - strip_* removes the pattern once and tells you whether it was there
//    - trim_*_matches removes it repeatedly ("a.git.git" -> "a")
// -----------------------------------------------------------------------------
