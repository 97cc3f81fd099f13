//! jsonapi-spider main entry point
//!
//! This is the command-line interface for the JSON:API crawler.

use anyhow::Context;
use clap::Parser;
use jsonapi_spider::config::{load_config_with_hash, Config};
use jsonapi_spider::output::print_summary;
use jsonapi_spider::{run_crawl, Depth};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// jsonapi-spider: a relationship-aware JSON:API crawler
///
/// Crawls the configured roots of a JSON:API backend, follows typed
/// relationships up to the configured depth and writes every resource
/// as JSON under the output location.
#[derive(Parser, Debug)]
#[command(name = "jsonapi-spider")]
#[command(version)]
#[command(about = "A relationship-aware JSON:API crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the configured relationship depth (0 is treated as 1)
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(depth) = cli.depth {
        config.crawl.depth = Some(depth);
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let summary = run_crawl(&config).await.context("Crawl failed")?;
    if !cli.quiet {
        print_summary(&summary);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jsonapi_spider=info,warn"),
            1 => EnvFilter::new("jsonapi_spider=debug,info"),
            2 => EnvFilter::new("jsonapi_spider=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== jsonapi-spider Dry Run ===\n");

    println!("API:");
    println!(
        "  Base URL: {}",
        config.api.base_url.as_deref().unwrap_or("(none)")
    );
    println!("  Max concurrent fetches: {}", config.api.max_concurrent);
    println!("  Timeout: {}s", config.api.timeout_secs);
    println!("  Terminate on error: {}", config.api.terminate_on_error);
    println!("  Relationships: {}", config.api.relationships.join(", "));
    println!("  Page entity: {}", config.api.page_entity);

    println!("\nCrawl:");
    println!("  Depth: {}", Depth::from_limit(config.crawl.depth));
    println!("  Roots ({}):", config.crawl.roots.len());
    for root in &config.crawl.roots {
        println!("    * {}", root);
    }
    println!("  Kinds ({}):", config.crawl.kinds.len());
    for kind in &config.crawl.kinds {
        println!("    * {} (via /{}_type/{}_type)", kind, kind, kind);
    }

    println!("\nOutput:");
    println!("  Location: {}", config.output.location.display());
    println!("  Wipe: {}", config.output.wipe);
    println!("  Clean: {}", config.output.clean);

    println!("\n✓ Configuration is valid");
}
