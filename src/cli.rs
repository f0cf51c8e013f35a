// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things). Flags that hold secrets
// or deployment settings also read from environment variables.
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use repo_snapshot::Config;
use repo_snapshot::github::{DEFAULT_API_URL, DEFAULT_MAX_RETRIES};
use repo_snapshot::tree::DEFAULT_CONCURRENCY;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "repo-snapshot",
    version,
    about = "Fetch every file of a GitHub repository as a JSON tree",
    long_about = "repo-snapshot walks a GitHub repository through the Contents API and prints \
                  every directory and file (with decoded contents) as one JSON document."
)]
pub struct Cli {
    /// GitHub repository URL (e.g., https://github.com/user/repo)
    ///
    /// Example: repo-snapshot https://github.com/rust-lang/log
    pub repo_url: String,

    /// Start from this path inside the repository instead of the root
    #[arg(long, default_value = "")]
    pub path: String,

    /// Branch, tag or commit to read (defaults to the default branch)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Maximum number of GitHub API calls in flight at once
    ///
    /// 1 fetches strictly one entry at a time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Timeout for each API call, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Give up on the whole fetch after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Retries for transient errors and secondary rate limits
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub retries: u32,

    /// GitHub token; raises the API rate limit
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Turns the parsed flags into a fetch configuration.
    pub fn config(&self) -> Result<Config> {
        if self.concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }
        if self.timeout == 0 {
            bail!("--timeout must be at least 1 second");
        }

        Ok(Config {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            git_ref: self.git_ref.clone(),
            concurrency: self.concurrency,
            request_timeout: Duration::from_secs(self.timeout),
            deadline: self.deadline.map(Duration::from_secs),
            max_retries: self.retries,
        })
    }
}
