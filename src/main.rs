//! Statute-Crawler main entry point
//!
//! This is the command-line interface for the legal-code crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use statute_crawler::config::{load_config_with_hash, Config, OutputFormat};
use statute_crawler::crawler::{crawl, Coordinator};
use statute_crawler::output::print_statistics;
use tracing_subscriber::EnvFilter;

/// Statute-Crawler: a polite crawler for state legal codes
///
/// Statute-Crawler walks a legal-code website from its root listing down to
/// individual sections, fetching sections with a bounded pool of workers,
/// and writes the full hierarchy and section text to a single document.
#[derive(Parser, Debug)]
#[command(name = "statute-crawler")]
#[command(version)]
#[command(about = "A polite crawler for state legal codes", long_about = None)]
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

    /// Override the number of section workers
    #[arg(short, long, value_name = "N")]
    concurrency: Option<u32>,

    /// Override the output file path
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Override the output format (flat, tree, sqlite)
    #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Expand the hierarchy and report what would be crawled without fetching sections
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(config, config_hash).await
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("statute_crawler=info,warn"),
            1 => EnvFilter::new("statute_crawler=debug,info"),
            2 => EnvFilter::new("statute_crawler=trace,debug"),
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

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    match value {
        "flat" => Ok(OutputFormat::Flat),
        "tree" => Ok(OutputFormat::Tree),
        "sqlite" => Ok(OutputFormat::Sqlite),
        other => Err(format!("unknown format '{}', expected flat, tree or sqlite", other)),
    }
}

/// Applies command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(concurrency) = cli.concurrency {
        anyhow::ensure!(
            (1..=100).contains(&concurrency),
            "--concurrency must be between 1 and 100, got {}",
            concurrency
        );
        config.crawler.concurrency = concurrency;
    }
    if let Some(output) = &cli.output {
        anyhow::ensure!(!output.is_empty(), "--output cannot be empty");
        config.output.path = output.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    Ok(())
}

/// Handles the --dry-run mode: expands the hierarchy and reports the worklist
async fn handle_dry_run(config: Config, config_hash: String) -> anyhow::Result<()> {
    println!("=== Statute-Crawler Dry Run ===\n");

    println!("Site:");
    println!("  Name: {}", config.site.name);
    println!("  Root: {}", config.site.root_url);
    println!("  Strategy: {:?}", config.site.strategy);
    let levels: Vec<&str> = config.site.levels.iter().map(|l| l.as_str()).collect();
    println!("  Levels: {}", levels.join(" > "));

    println!("\nCrawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Request delay: {}ms", config.crawler.request_delay);
    println!("  Expansion delay: {}ms", config.crawler.expansion_delay);
    println!("  Section discovery: {:?}", config.crawler.section_discovery);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Path: {} ({:?})", config.output.path, config.output.format);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    let coordinator = Coordinator::new(config, config_hash).context("failed to start crawler")?;
    let plan = coordinator
        .plan()
        .await
        .context("failed to expand hierarchy")?;

    println!("\n✓ Configuration is valid");
    println!("✓ Top-level nodes: {}", plan.tree.len());
    if plan.chapter_count() > 0 {
        println!(
            "✓ Would list sections of {} chapters",
            plan.chapter_count()
        );
    } else {
        println!("✓ Would fetch {} sections", plan.leaf_count());
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    tracing::info!(
        "Site: {}, strategy: {:?}, workers: {}",
        config.site.name,
        config.site.strategy,
        config.crawler.concurrency
    );

    let output_path = config.output.path.clone();
    let stats = crawl(config, config_hash).await.context("crawl failed")?;

    print_statistics(&stats);
    println!("\n✓ Output written to: {}", output_path);

    Ok(())
}
