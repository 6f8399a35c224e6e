//! Trellis-Scrape main entry point
//!
//! This is the command-line interface for running a scrape job file.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use trellis_scrape::config::{load_job_with_hash, JobFile};
use trellis_scrape::operations::{build_root, CompositeOperation, Operation};
use trellis_scrape::output::print_summary;
use trellis_scrape::Scraper;
use tracing_subscriber::EnvFilter;

/// Trellis-Scrape: a tree-shaped polite web scraper
///
/// Trellis-Scrape opens a start page, runs a declared tree of operations on
/// it, follows links and paginated listings into further pages, and prints
/// the extracted data as a JSON tree mirroring the operations.
#[derive(Parser, Debug)]
#[command(name = "trellis-scrape")]
#[command(version = "1.0.0")]
#[command(about = "A tree-shaped polite web scraper", long_about = None)]
struct Cli {
    /// Path to TOML job file
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the job and show the operation tree without scraping
    #[arg(long)]
    dry_run: bool,

    /// Write the result tree to this file instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "dry_run")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The job decides whether console logs are wanted, so it loads first
    let (job, hash) = match load_job_with_hash(&cli.job) {
        Ok(loaded) => loaded,
        Err(e) => {
            setup_logging(cli.verbose, cli.quiet);
            tracing::error!("Failed to load job {}: {}", cli.job.display(), e);
            return Err(e.into());
        }
    };

    setup_logging(cli.verbose, cli.quiet || !job.scraper.show_console_logs);
    tracing::info!("Job loaded from {} (hash: {})", cli.job.display(), hash);

    if cli.dry_run {
        handle_dry_run(&job);
        return Ok(());
    }

    handle_scrape(job, cli.output).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trellis_scrape=info,warn"),
            1 => EnvFilter::new("trellis_scrape=debug,info"),
            2 => EnvFilter::new("trellis_scrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the settings and the operation tree
fn handle_dry_run(job: &JobFile) {
    let config = &job.scraper;
    let root = build_root(&job.root);

    println!("=== Trellis-Scrape Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Base site URL: {}", config.base_site_url);
    println!("  Start URL: {}", config.start_url);
    println!("  Concurrency: {}", config.concurrency);
    println!("  Max retries: {}", config.max_retries);
    println!("  Delay: {}ms", config.delay);
    println!("  Timeout: {}ms", config.timeout);
    println!(
        "  Skipped status codes: {:?}",
        config.skip_codes().into_iter().collect::<Vec<_>>()
    );
    if let Some(proxy) = &config.proxy {
        println!("  Proxy: {}", proxy);
    }
    if let Some(log_path) = &config.log_path {
        println!("  Log path: {}", log_path);
    }
    if let Some(file_path) = &config.file_path {
        println!("  File path: {}", file_path);
    }

    println!("\nOperations:");
    println!("  {} (Root)", root.name());
    for child in root.children() {
        print_operation(child, 2);
    }

    println!("\n✓ Job is valid");
}

fn print_operation(operation: &Operation, depth: usize) {
    println!(
        "{}{} ({})",
        "  ".repeat(depth),
        operation.name(),
        operation.kind()
    );
    for child in operation.children() {
        print_operation(child, depth + 1);
    }
}

/// Handles the main scrape: runs the job and emits the result tree
async fn handle_scrape(job: JobFile, output: Option<PathBuf>) -> anyhow::Result<()> {
    let root = build_root(&job.root);
    let scraper = Scraper::new(job.scraper)?;

    let result = match scraper.scrape(&root).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            return Err(e.into());
        }
    };

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            println!("✓ Results written to: {}", path.display());
            if scraper.context().config().show_console_logs {
                print_summary(&scraper.summary());
            }
        }
        None => println!("{}", json),
    }

    Ok(())
}
