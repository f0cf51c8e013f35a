// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Load .env and set up logging
// 2. Parse command-line arguments using clap
// 3. Turn the repository URL into owner/repo
// 4. Fetch the whole tree and print it as JSON on stdout
// 5. Exit with proper code (0 = success, 1 = invalid input, 2 = fetch error)
//
// Logs go to stderr (RUST_LOG controls how much), so stdout stays pure JSON
// and can be piped straight into other tools.
// =============================================================================

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::{error, info, warn};
use repo_snapshot::{
    parse_identifier, Config, FetchReport, GitHubClient, RepositoryIdentifier, TreeFetcher,
};
use tokio_util::sync::CancellationToken;

const EXIT_INVALID_INPUT: i32 = 1;
const EXIT_FETCH_FAILED: i32 = 2;

const INVALID_URL_MESSAGE: &str =
    "Invalid GitHub URL. Please provide a link like: https://github.com/owner/repo";

#[tokio::main]
async fn main() {
    // A missing .env is fine; the token can come from the real environment
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FETCH_FAILED
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = tree printed
//   Ok(1) = invalid input (bad URL or bad flags)
//   Ok(2) = fetching failed
//   Err   = output failure
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let (repo, config, client) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(message) => {
            eprintln!("{}", message);
            return Ok(EXIT_INVALID_INPUT);
        }
    };

    if config.token.is_none() {
        warn!("No GITHUB_TOKEN set, GitHub allows only 60 requests per hour");
    }

    // Ctrl-C stops the fetch instead of killing the process mid-write
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling fetch");
            on_interrupt.cancel();
        }
    });

    let fetcher = TreeFetcher::new(client)
        .with_options(config.fetch_options())
        .with_cancellation(cancel);

    info!("Fetching code for {}...", repo);
    let contents = match fetcher.fetch(&repo, &cli.path).await {
        Ok(contents) => contents,
        Err(err) => {
            error!("Failed to fetch repository content for {}: {}", repo, err);
            eprintln!("Failed to fetch repository content: {}", err.user_message());
            return Ok(EXIT_FETCH_FAILED);
        }
    };

    let (files, dirs) = contents.counts();
    info!(
        "Successfully fetched code for {} ({} files, {} directories)",
        repo, files, dirs
    );
    if let Some(budget) = fetcher.client().rate_limit() {
        info!("GitHub API requests left: {}", budget.remaining);
    }

    print_report(&FetchReport::new(&repo, contents), cli.pretty)?;
    Ok(0)
}

fn print_report(report: &FetchReport, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    println!("{}", json);
    Ok(())
}

// Checks everything the user typed before any request goes out
//
// Returns the message to show when the input is unusable
fn prepare(cli: &Cli) -> std::result::Result<(RepositoryIdentifier, Config, GitHubClient), String> {
    let repo = parse_identifier(&cli.repo_url).ok_or_else(|| INVALID_URL_MESSAGE.to_string())?;
    let config = cli.config().map_err(|e| format!("Error: {:#}", e))?;
    let client = config.client().map_err(|e| format!("Error: {}", e))?;
    Ok((repo, config, client))
}
