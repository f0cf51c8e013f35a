// src/tree/fetch.rs
// =============================================================================
// Fetches a whole repository tree through a ContentApi.
//
// How it works:
// 1. Ask the API for the starting path
// 2. A single file comes back as-is (decoded); no recursion
// 3. A listing opens a directory: one job per entry goes on the front of
//    the queue, so subdirectories are walked depth-first
//    - directory entries become "list" jobs that open further directories
//    - file entries become "file" jobs that fetch and decode the content
// 4. Up to `concurrency` jobs run at once; each result lands in the slot
//    reserved for it, so output order is listing order, not finish order
// 5. When nothing is queued or running, the arena is folded into a tree
//
// Failure policy:
// - A file that cannot be fetched or decoded stays in the tree with a
//   FetchFailed sentinel, and everything else carries on
// - A directory that cannot be listed fails the whole fetch; returning
//   drops every in-flight request at once
//
// Directories live in an arena instead of on the call stack, so deep
// repositories don't mean deep recursion.
// =============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use super::decode::file_content;
use super::node::{FileContent, Snapshot, TreeNode};
use crate::error::FetchError;
use crate::github::{ContentApi, ContentEntry, ContentResponse, RepositoryIdentifier};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Tuning knobs for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum API calls in flight at once; 1 fetches strictly one by one
    pub concurrency: usize,
    /// Upper bound on the whole fetch
    pub deadline: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
        }
    }
}

/// Walks a repository through a [`ContentApi`].
pub struct TreeFetcher<C> {
    client: C,
    options: FetchOptions,
    cancel: CancellationToken,
}

impl<C: ContentApi> TreeFetcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            options: FetchOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetches abort with [`FetchError::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetches `path` (empty for the repository root) and everything below it.
    pub async fn fetch(
        &self,
        repo: &RepositoryIdentifier,
        path: &str,
    ) -> Result<Snapshot, FetchError> {
        match self.options.deadline {
            Some(limit) => tokio::time::timeout(limit, self.walk(repo, path))
                .await
                .unwrap_or(Err(FetchError::Timeout(limit))),
            None => self.walk(repo, path).await,
        }
    }

    async fn walk(&self, repo: &RepositoryIdentifier, path: &str) -> Result<Snapshot, FetchError> {
        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
            response = self.client.get_content(repo, path) => response,
        };

        let entries = match response {
            Ok(ContentResponse::File(file)) => {
                let content = file_content(&file, FileContent::NoContent)?;
                return Ok(Snapshot::File(TreeNode::file(file.name, file.path, content)));
            }
            Ok(ContentResponse::Listing(entries)) => entries,
            Err(err) => {
                error!("[Fetcher] Failed to list '{}' in {}: {}", path, repo, err);
                return Err(err);
            }
        };

        let mut arena = Arena::new(path);
        let mut queue = VecDeque::new();
        arena.open(Arena::ROOT, entries, &mut queue);

        let concurrency = self.options.concurrency.max(1);
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < concurrency {
                match queue.pop_front() {
                    Some(job) => in_flight.push(self.run(repo, job)),
                    None => break,
                }
            }

            // Nothing queued and nothing running: every slot is filled
            if in_flight.is_empty() {
                break;
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                Some(outcome) = in_flight.next() => outcome,
            };

            match outcome {
                Outcome::Listed { dir, path, result } => match result {
                    Ok(ContentResponse::Listing(entries)) => arena.open(dir, entries, &mut queue),
                    Ok(ContentResponse::File(_)) => {
                        error!("[Fetcher] Expected a directory at '{}', got a file", path);
                        return Err(FetchError::UnexpectedResponse {
                            path,
                            reason: "expected a directory listing, got a file".to_string(),
                        });
                    }
                    Err(err) => {
                        error!("[Fetcher] Failed to list '{}' in {}: {}", path, repo, err);
                        return Err(err);
                    }
                },
                Outcome::Fetched {
                    dir,
                    slot,
                    entry,
                    result,
                } => {
                    let content = result.and_then(|response| entry_content(&entry, response));
                    let content = content.unwrap_or_else(|err| {
                        warn!("[Fetcher] Error fetching file '{}': {}", entry.path, err);
                        FileContent::FetchFailed(err.to_string())
                    });
                    arena.fill(dir, slot, TreeNode::file(entry.name, entry.path, content));
                }
            }
        }

        let nodes = arena.assemble();
        info!("[Fetcher] Fetched {} top-level entries of {}", nodes.len(), repo);
        Ok(Snapshot::Listing(nodes))
    }

    // Runs one API call; the caller decides what a failure means
    async fn run(&self, repo: &RepositoryIdentifier, job: Job) -> Outcome {
        match job {
            Job::List { dir, path } => {
                let result = self.client.get_content(repo, &path).await;
                Outcome::Listed { dir, path, result }
            }
            Job::Fetch { dir, slot, entry } => {
                let result = self.client.get_content(repo, &entry.path).await;
                Outcome::Fetched {
                    dir,
                    slot,
                    entry,
                    result,
                }
            }
        }
    }
}

/// Fetches the whole tree of `owner/repo` with default options.
pub async fn fetch_tree<C: ContentApi>(
    client: C,
    owner: &str,
    repo: &str,
) -> Result<Snapshot, FetchError> {
    let repo = RepositoryIdentifier::new(owner, repo);
    TreeFetcher::new(client).fetch(&repo, "").await
}

// Content of a file entry from its own API response
fn entry_content(entry: &ContentEntry, response: ContentResponse) -> Result<FileContent, FetchError> {
    match response {
        ContentResponse::File(file) => file_content(&file, FileContent::NotInlined),
        // Submodules and odd entry types can answer with a listing
        ContentResponse::Listing(_) => {
            debug!("[Fetcher] '{}' answered with a listing", entry.path);
            Ok(FileContent::NotInlined)
        }
    }
}

enum Job {
    List { dir: usize, path: String },
    Fetch { dir: usize, slot: usize, entry: ContentEntry },
}

enum Outcome {
    Listed {
        dir: usize,
        path: String,
        result: Result<ContentResponse, FetchError>,
    },
    Fetched {
        dir: usize,
        slot: usize,
        entry: ContentEntry,
        result: Result<ContentResponse, FetchError>,
    },
}

enum Slot {
    Pending,
    Dir(usize),
    Ready(TreeNode),
}

struct PendingDir {
    name: String,
    path: String,
    children: Vec<Slot>,
}

// Directories seen so far, indexed by the order they were discovered.
// A child directory always gets a higher index than its parent.
struct Arena {
    dirs: Vec<PendingDir>,
}

impl Arena {
    const ROOT: usize = 0;

    fn new(root_path: &str) -> Self {
        Self {
            dirs: vec![PendingDir {
                name: String::new(),
                path: root_path.to_string(),
                children: Vec::new(),
            }],
        }
    }

    // Reserves one slot per entry of `dir` and queues the work to fill them.
    // The jobs go to the front of the queue in listing order, so a directory
    // is finished before its next sibling starts (depth-first, like a plain
    // recursive walk when only one call runs at a time)
    fn open(&mut self, dir: usize, entries: Vec<ContentEntry>, queue: &mut VecDeque<Job>) {
        let mut children = Vec::with_capacity(entries.len());
        let mut jobs = Vec::with_capacity(entries.len());

        for (slot, entry) in entries.into_iter().enumerate() {
            debug!("[Fetcher] Processing: {}", entry.path);

            if entry.is_dir() {
                let child = self.dirs.len();
                jobs.push(Job::List {
                    dir: child,
                    path: entry.path.clone(),
                });
                self.dirs.push(PendingDir {
                    name: entry.name,
                    path: entry.path,
                    children: Vec::new(),
                });
                children.push(Slot::Dir(child));
            } else {
                jobs.push(Job::Fetch { dir, slot, entry });
                children.push(Slot::Pending);
            }
        }

        for job in jobs.into_iter().rev() {
            queue.push_front(job);
        }
        self.dirs[dir].children = children;
    }

    fn fill(&mut self, dir: usize, slot: usize, node: TreeNode) {
        self.dirs[dir].children[slot] = Slot::Ready(node);
    }

    // Builds the tree bottom-up: walking indices in reverse means every
    // child directory is finished before its parent needs it
    fn assemble(self) -> Vec<TreeNode> {
        let mut built: Vec<Option<TreeNode>> = (0..self.dirs.len()).map(|_| None).collect();
        let mut root = Vec::new();

        for (index, dir) in self.dirs.into_iter().enumerate().rev() {
            let children: Vec<TreeNode> = dir
                .children
                .into_iter()
                .filter_map(|slot| match slot {
                    Slot::Ready(node) => Some(node),
                    Slot::Dir(child) => built[child].take(),
                    // Only reachable if a job was lost, which the loop rules out
                    Slot::Pending => None,
                })
                .collect();

            if index == Self::ROOT {
                root = children;
            } else {
                built[index] = Some(TreeNode::dir(dir.name, dir.path, children));
            }
        }

        root
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is FuturesUnordered?
//    - A set of futures polled together; .next() yields whichever finishes first
//    - Keeping it at most `concurrency` long is what bounds the API calls
//    - Dropping it drops every future inside, which cancels those requests
//
// 2. What does tokio::select! do here?
//    - Waits on several futures and runs the branch of the first one ready
//    - `biased;` checks the branches top to bottom, so a cancelled token wins
//      over a result that happens to be ready at the same moment
//
// 3. Why slots instead of pushing results into a Vec?
//    - Results arrive in completion order, but the tree must keep listing order
//    - Each entry gets its slot index up front; the result just fills it in
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::github::fake::FakeContentApi;

    fn repo() -> RepositoryIdentifier {
        RepositoryIdentifier::new("acme", "widgets")
    }

    fn fetcher(api: FakeContentApi, concurrency: usize) -> TreeFetcher<Arc<FakeContentApi>> {
        TreeFetcher::new(Arc::new(api)).with_options(FetchOptions {
            concurrency,
            deadline: None,
        })
    }

    fn listing(snapshot: Snapshot) -> Vec<TreeNode> {
        match snapshot {
            Snapshot::Listing(nodes) => nodes,
            Snapshot::File(node) => panic!("expected a listing, got {:?}", node),
        }
    }

    fn text(node: &TreeNode) -> String {
        node.content().expect("file node").to_string()
    }

    #[tokio::test]
    async fn test_single_file_path() {
        let api = FakeContentApi::new().file("README.md", "# Widgets\n");
        let snapshot = fetcher(api, 4).fetch(&repo(), "README.md").await.unwrap();

        let Snapshot::File(node) = snapshot else {
            panic!("expected a single file");
        };
        assert_eq!(node.name(), "README.md");
        assert_eq!(node.content(), Some(&FileContent::Text("# Widgets\n".to_string())));
    }

    #[tokio::test]
    async fn test_single_file_without_payload() {
        let api = FakeContentApi::new().file_without_content("logo.png");
        let snapshot = fetcher(api, 4).fetch(&repo(), "logo.png").await.unwrap();

        let Snapshot::File(node) = snapshot else {
            panic!("expected a single file");
        };
        assert_eq!(text(&node), "[No content]");
    }

    #[tokio::test]
    async fn test_single_file_decode_failure_propagates() {
        let api = FakeContentApi::new().raw_file("broken.txt", "@@@@");
        let err = fetcher(api, 4).fetch(&repo(), "broken.txt").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_listing_keeps_order_and_count() {
        let api = FakeContentApi::new()
            .dir("", &["zeta.txt", "src/", "alpha.txt", "docs/"])
            .file("zeta.txt", "z")
            .file("alpha.txt", "a")
            .dir("src", &["src/lib.rs"])
            .file("src/lib.rs", "pub fn f() {}")
            .dir("docs", &[]);

        let nodes = listing(fetcher(api, 4).fetch(&repo(), "").await.unwrap());

        let names: Vec<&str> = nodes.iter().map(TreeNode::name).collect();
        assert_eq!(names, ["zeta.txt", "src", "alpha.txt", "docs"]);
        assert!(nodes[1].is_dir());
        assert_eq!(nodes[1].children().len(), 1);
        assert!(nodes[3].is_dir());
        assert!(nodes[3].children().is_empty());
        assert_eq!(text(&nodes[2]), "a");
    }

    #[tokio::test]
    async fn test_order_survives_out_of_order_completion() {
        let api = FakeContentApi::new()
            .dir("", &["slow.txt", "medium.txt", "fast.txt"])
            .file("slow.txt", "1")
            .file("medium.txt", "2")
            .file("fast.txt", "3")
            .delay("slow.txt", Duration::from_millis(60))
            .delay("medium.txt", Duration::from_millis(30));

        let nodes = listing(fetcher(api, 3).fetch(&repo(), "").await.unwrap());

        let contents: Vec<String> = nodes.iter().map(text).collect();
        assert_eq!(contents, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_failed_file_becomes_sentinel() {
        let api = FakeContentApi::new()
            .dir("", &["a.txt", "b.txt", "c.txt"])
            .file("a.txt", "a")
            .status("b.txt", 500)
            .file("c.txt", "c");

        let nodes = listing(fetcher(api, 1).fetch(&repo(), "").await.unwrap());

        assert_eq!(nodes.len(), 3);
        assert_eq!(text(&nodes[0]), "a");
        assert_eq!(text(&nodes[1]), "[Error fetching content: HTTP 500: scripted failure]");
        assert_eq!(nodes[1].error(), Some("HTTP 500: scripted failure"));
        assert_eq!(text(&nodes[2]), "c");
    }

    #[tokio::test]
    async fn test_undecodable_file_becomes_sentinel() {
        let api = FakeContentApi::new()
            .dir("", &["bad.txt", "ok.txt"])
            .raw_file("bad.txt", "@@@@")
            .file("ok.txt", "fine");

        let nodes = listing(fetcher(api, 2).fetch(&repo(), "").await.unwrap());

        assert!(text(&nodes[0]).starts_with("[Error fetching content: could not decode bad.txt"));
        assert_eq!(text(&nodes[1]), "fine");
    }

    #[tokio::test]
    async fn test_file_without_payload_in_listing() {
        let api = FakeContentApi::new()
            .dir("", &["big.bin"])
            .file_without_content("big.bin");

        let nodes = listing(fetcher(api, 2).fetch(&repo(), "").await.unwrap());
        assert_eq!(text(&nodes[0]), "[Non-text or too large to fetch directly]");
        assert_eq!(nodes[0].error(), None);
    }

    #[tokio::test]
    async fn test_missing_subdirectory_fails_whole_fetch() {
        let api = FakeContentApi::new()
            .dir("", &["a.txt", "src/"])
            .file("a.txt", "a")
            .dir("src", &["src/gone/"]);
        // "src/gone" is not scripted, so listing it answers 404

        let err = fetcher(api, 4).fetch(&repo(), "").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, FetchError::NotFound { ref path } if path == "src/gone"));
    }

    #[tokio::test]
    async fn test_rate_limited_listing_keeps_status() {
        let api = FakeContentApi::new().status("", 403);
        let err = fetcher(api, 4).fetch(&repo(), "").await.unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_subdirectory_answering_with_file_is_fatal() {
        let api = FakeContentApi::new()
            .dir("", &["src/"])
            .file("src", "surprise");

        let err = fetcher(api, 4).fetch(&repo(), "").await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_fatal_failure_does_not_wait_for_siblings() {
        let api = FakeContentApi::new()
            .dir("", &["huge.bin", "broken/"])
            .file("huge.bin", "x")
            .delay("huge.bin", Duration::from_secs(30))
            .status("broken", 500);

        let started = Instant::now();
        let err = fetcher(api, 4).fetch(&repo(), "").await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_three_levels_deep() {
        let api = FakeContentApi::new()
            .dir("", &["a/"])
            .dir("a", &["a/b/", "a/top.txt"])
            .dir("a/b", &["a/b/c/"])
            .dir("a/b/c", &["a/b/c/leaf.txt"])
            .file("a/top.txt", "top")
            .file("a/b/c/leaf.txt", "leaf");

        let nodes = listing(fetcher(api, 2).fetch(&repo(), "").await.unwrap());

        let a = &nodes[0];
        assert_eq!(a.path(), "a");
        let b = &a.children()[0];
        assert_eq!(b.path(), "a/b");
        assert_eq!(a.children()[1].path(), "a/top.txt");
        let c = &b.children()[0];
        assert_eq!(c.path(), "a/b/c");
        let leaf = &c.children()[0];
        assert_eq!(leaf.path(), format!("{}/{}", c.path(), leaf.name()));
        assert_eq!(text(leaf), "leaf");
    }

    #[tokio::test]
    async fn test_starting_path_lists_subdirectory() {
        let api = FakeContentApi::new()
            .dir("src", &["src/main.rs"])
            .file("src/main.rs", "fn main() {}");

        let nodes = listing(fetcher(api, 2).fetch(&repo(), "src").await.unwrap());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].path(), "src/main.rs");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let files: Vec<String> = (0..12).map(|i| format!("f{}.txt", i)).collect();
        let entries: Vec<&str> = files.iter().map(String::as_str).collect();

        let mut api = FakeContentApi::new().dir("", &entries);
        for file in &files {
            api = api.file(file, "x").delay(file, Duration::from_millis(10));
        }
        let api = Arc::new(api);

        let fetcher = TreeFetcher::new(Arc::clone(&api)).with_options(FetchOptions {
            concurrency: 3,
            deadline: None,
        });
        let nodes = listing(fetcher.fetch(&repo(), "").await.unwrap());

        assert_eq!(nodes.len(), 12);
        assert!(api.peak_in_flight() <= 3);
        assert!(api.peak_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_concurrency_of_one_is_sequential() {
        let api = Arc::new(
            FakeContentApi::new()
                .dir("", &["a.txt", "b.txt"])
                .file("a.txt", "a")
                .file("b.txt", "b")
                .delay("a.txt", Duration::from_millis(10)),
        );

        let fetcher = TreeFetcher::new(Arc::clone(&api)).with_options(FetchOptions {
            concurrency: 1,
            deadline: None,
        });
        fetcher.fetch(&repo(), "").await.unwrap();

        assert_eq!(api.peak_in_flight(), 1);
        assert_eq!(api.calls(), ["", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_concurrency_of_one_finishes_subdirectory_first() {
        let api = Arc::new(
            FakeContentApi::new()
                .dir("", &["a/", "b.txt"])
                .dir("a", &["a/x.txt"])
                .file("a/x.txt", "x")
                .file("b.txt", "b"),
        );

        let fetcher = TreeFetcher::new(Arc::clone(&api)).with_options(FetchOptions {
            concurrency: 1,
            deadline: None,
        });
        let nodes = listing(fetcher.fetch(&repo(), "").await.unwrap());

        assert_eq!(api.calls(), ["", "a", "a/x.txt", "b.txt"]);
        assert_eq!(nodes[0].children()[0].path(), "a/x.txt");
        assert_eq!(text(&nodes[1]), "b");
    }

    #[tokio::test]
    async fn test_concurrency_of_one_reports_first_failing_subtree() {
        let api = Arc::new(
            FakeContentApi::new()
                .dir("", &["a/", "b/"])
                .dir("a", &["a/deep/"])
                .status("b", 500),
        );
        // "a/deep" is not scripted, so listing it answers 404

        let fetcher = TreeFetcher::new(Arc::clone(&api)).with_options(FetchOptions {
            concurrency: 1,
            deadline: None,
        });
        let err = fetcher.fetch(&repo(), "").await.unwrap_err();

        assert!(matches!(err, FetchError::NotFound { ref path } if path == "a/deep"));
        assert_eq!(err.status(), Some(404));
        assert_eq!(api.calls(), ["", "a", "a/deep"]);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts() {
        let token = CancellationToken::new();
        token.cancel();

        let api = FakeContentApi::new().dir("", &[]);
        let err = fetcher(api, 2)
            .with_cancellation(token)
            .fetch(&repo(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_during_fetch() {
        let token = CancellationToken::new();
        let api = FakeContentApi::new()
            .dir("", &["slow.txt"])
            .file("slow.txt", "x")
            .delay("slow.txt", Duration::from_secs(30));
        let fetcher = fetcher(api, 2).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = fetcher.fetch(&repo(), "").await.unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_deadline() {
        let api = FakeContentApi::new()
            .dir("", &["slow.txt"])
            .file("slow.txt", "x")
            .delay("slow.txt", Duration::from_secs(30));

        let err = TreeFetcher::new(api)
            .with_options(FetchOptions {
                concurrency: 1,
                deadline: Some(Duration::from_millis(20)),
            })
            .fetch(&repo(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_tree_helper() {
        let api = FakeContentApi::new()
            .dir("", &["README.md"])
            .file("README.md", "hi");

        let nodes = listing(fetch_tree(api, "acme", "widgets").await.unwrap());
        assert_eq!(text(&nodes[0]), "hi");
    }
}
