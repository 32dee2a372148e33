//! Lyrics-Scraper main entry point
//!
//! This is the command-line interface for the Lyrics-Scraper lyrics crawler.

use anyhow::{bail, Context};
use clap::Parser;
use lyrics_scraper::cache::WebCache;
use lyrics_scraper::config::{load_config_with_hash, Config};
use lyrics_scraper::output::{load_statistics, print_run_summary, print_statistics};
use lyrics_scraper::storage::open_storage;
use lyrics_scraper::Coordinator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lyrics-Scraper: a polite lyrics crawler
///
/// Lyrics-Scraper resolves the artists, albums and songs listed in a TOML
/// configuration against a lyrics website, caches every page it fetches and
/// stores the lyrics in a SQLite music database.
#[derive(Parser, Debug)]
#[command(name = "lyrics-scraper")]
#[command(version)]
#[command(about = "A polite lyrics crawler", long_about = None)]
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

    /// Validate config and list the targets without scraping
    #[arg(long, conflicts_with_all = ["stats", "clear_cache"])]
    dry_run: bool,

    /// Show statistics from the music database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear_cache"])]
    stats: bool,

    /// Empty the web cache and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    clear_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.clear_cache {
        handle_clear_cache(&config)?;
    } else {
        handle_scrape(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lyrics_scraper=info,warn"),
            1 => EnvFilter::new("lyrics_scraper=debug,info"),
            2 => EnvFilter::new("lyrics_scraper=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be scraped
fn handle_dry_run(config: &Config) {
    println!("=== Lyrics-Scraper Dry Run ===\n");

    println!("Storage:");
    println!("  Database: {}", config.db_path().display());
    println!("  Overwrite: {}", config.overwrite_db);
    println!("  Simulate: {}", config.simulate);
    if config.use_webcache {
        println!(
            "  Web cache: {} (entries expire after {}s)",
            config.webcache_path().display(),
            config.expire_after
        );
    } else {
        println!("  Web cache: disabled");
    }

    println!("\nFetching:");
    println!("  Site: {}", config.site.base_url);
    println!("  Delay between requests: {}s", config.delay_between_requests);
    println!("  Timeout: {}s", config.http_get_timeout);
    println!("  Best match: {}", config.best_match);
    println!("  Ignore errors: {}", config.ignore_errors);
    println!("  Seed: {}", config.seed);

    let section = |name: &str, skip: bool, count: usize| {
        let note = if skip { ", skipped" } else { "" };
        println!("\n{} ({}{}):", name, count, note);
    };

    section(
        "Songs",
        config.songs_config.skip,
        config.songs_config.targets.len(),
    );
    for entry in &config.songs_config.targets {
        let target = entry.to_target();
        match (&target.url, &target.artist) {
            (Some(url), _) => println!("  - {}", url),
            (None, Some(artist)) => println!("  - {} by {}", target.title, artist),
            (None, None) => println!("  - {}", target.title),
        }
    }

    section(
        "Albums",
        config.albums_config.skip,
        config.albums_config.targets.len(),
    );
    for album in &config.albums_config.targets {
        let limit = album
            .max_songs
            .map_or_else(|| "all songs".to_string(), |n| format!("{} songs", n));
        match &album.url {
            Some(url) => println!("  - {} ({})", url, limit),
            None => println!(
                "  - {} by {} ({})",
                album.title,
                album.artist.as_deref().unwrap_or("unknown artist"),
                limit
            ),
        }
    }

    section(
        "Artists",
        config.artists_config.skip,
        config.artists_config.targets.len(),
    );
    for artist in &config.artists_config.targets {
        let name = artist.url.as_deref().unwrap_or(&artist.name);
        let years = match (artist.year_after, artist.year_before) {
            (None, None) => String::new(),
            (after, before) => format!(
                ", years {}..={}",
                after.map_or_else(|| "*".to_string(), |y| y.to_string()),
                before.map_or_else(|| "*".to_string(), |y| y.to_string())
            ),
        };
        let limit = artist
            .max_songs
            .map_or_else(|| "all songs".to_string(), |n| format!("{} songs", n));
        println!("  - {} ({}{})", name, limit, years);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would scrape {} targets", config.target_count());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config.db_path();
    if !path.exists() {
        bail!("database {} does not exist yet", path.display());
    }

    println!("Database: {}\n", path.display());
    let storage = open_storage(&path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --clear-cache mode: empties the web cache
fn handle_clear_cache(config: &Config) -> anyhow::Result<()> {
    let path = config.webcache_path();
    if !path.exists() {
        println!("No web cache at {}", path.display());
        return Ok(());
    }

    let cache = WebCache::open(&path)?;
    let removed = cache.clear()?;
    println!("✓ Removed {} entries from {}", removed, path.display());

    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::new(config)?;

    match coordinator.run().await {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            print_run_summary(coordinator.summary());
            Err(e).context("scrape aborted")
        }
    }
}
