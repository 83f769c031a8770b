//! Sumi-Harvest main entry point
//!
//! Command-line front end that harvests pages with the built-in page
//! harvester, starting from the seeds listed in a TOML configuration file.

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::extract::PageHarvester;
use sumi_harvest::output::{
    generate_markdown_summary, open_sink, print_statistics, RecordSink, RunSummary,
};
use sumi_harvest::transport::HttpTransport;
use sumi_harvest::{Engine, Extractor, FetchRequest, Transport};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a recursive data-gathering engine
///
/// Fetches every seed URL, records one entry per page and follows links up
/// to the configured depth, with caching, deduplication, throttling and
/// retries handled by the engine.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A recursive data-gathering engine", long_about = None)]
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

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,

    /// Write records here (JSON array, JSON lines for `.jsonl`, CSV for `.csv`)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write a markdown run summary here
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(
        config,
        config_hash,
        cli.output.as_deref(),
        cli.summary.as_deref(),
    )
    .await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the configuration and the seeds
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Engine:");
    println!("  Workers: {}", config.engine.concurrency);
    println!("  Deduplication: {}", config.engine.deduplication);

    println!("\nPacing:");
    match &config.delay {
        Some(delay) => println!("  Delay: {:?} {}ms", delay.kind, delay.amount_ms),
        None => println!("  Delay: none"),
    }
    match &config.rate_limit {
        Some(limit) => println!("  Rate limit: {} per {}ms", limit.max_rate, limit.period_ms),
        None => println!("  Rate limit: none"),
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms..{}ms (multiplier {}ms)",
        config.retry.backoff_min_ms, config.retry.backoff_max_ms, config.retry.backoff_multiplier_ms
    );

    println!("\nCache:");
    if config.cache.enabled {
        println!("  {:?} at {}", config.cache.kind, config.cache.path.display());
    } else {
        println!("  disabled");
    }

    println!("\nHarvest:");
    println!("  Max depth: {}", config.harvest.max_depth);
    println!("  Same host only: {}", config.harvest.same_host);
    println!("  User agent: {}", config.http.user_agent);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Runs the harvest, streaming records to the output file as they arrive
async fn handle_harvest(
    config: Config,
    config_hash: String,
    output: Option<&Path>,
    summary_path: Option<&Path>,
) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.http)?);
    let extractor: Arc<dyn Extractor> = Arc::new(PageHarvester::from_config(&config.harvest));

    let seeds = config
        .seeds
        .iter()
        .map(|seed| FetchRequest::get(seed.url.as_str(), extractor.clone(), transport.clone()))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid seed URL")?;

    let mut sink: Option<Box<dyn RecordSink>> = match output {
        Some(path) => Some(open_sink(path)?),
        None => None,
    };

    let engine = Engine::new(config)?;
    let started_at = chrono::Utc::now();
    let mut harvest = engine.run(seeds).await;

    let cancel = harvest.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight requests");
            cancel.cancel();
        }
    });

    while let Some(record) = harvest.next().await {
        match sink.as_mut() {
            Some(sink) => sink.write_record(&record)?,
            None => println!("{}", record),
        }
    }

    if let Some(sink) = sink.as_mut() {
        sink.finish()?;
        tracing::info!("Wrote {} record(s)", sink.written());
    }

    let stats = harvest.stats();
    let failures = harvest.failures();
    for failure in &failures {
        tracing::debug!("{}", failure);
    }

    if let Some(path) = summary_path {
        let summary = RunSummary {
            started_at,
            finished_at: chrono::Utc::now(),
            config_hash: Some(config_hash),
            cancelled: harvest.is_cancelled(),
            stats,
            failures,
        };
        generate_markdown_summary(&summary, path)?;
        tracing::info!("Summary written to {}", path.display());
    }

    print_statistics(&stats);
    Ok(())
}
