//! Product-Scout main entry point
//!
//! Command-line front end that drives the request pipeline once per
//! invocation and prints results as JSON.

use anyhow::{bail, Context};
use clap::Parser;
use product_scout::config::{load_config_with_hash, Config, SweepMode};
use product_scout::metrics::print_report;
use product_scout::pipeline::{CallContext, Coordinator};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Product-Scout: scrape product and listing pages into structured data
///
/// Each call is rate limited per caller, routed through the caller's assigned
/// proxy (or the default one), parsed with ordered fallback selectors and
/// recorded in the metrics.
#[derive(Parser, Debug)]
#[command(name = "product-scout")]
#[command(version = "1.0.0")]
#[command(about = "Product page scraping pipeline", long_about = None)]
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

    /// Validate config and show the effective settings without fetching
    #[arg(long, conflicts_with_all = ["urls", "search"])]
    dry_run: bool,

    /// Product page to scrape; repeat for a bulk scrape
    #[arg(long = "url", value_name = "URL", conflicts_with = "search")]
    urls: Vec<String>,

    /// Search query to run against the marketplace listing
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Listing page for --search (1-based)
    #[arg(long, default_value_t = 1, requires = "search")]
    page: u32,

    /// Caller identity used to pick the proxy
    #[arg(long, default_value = "cli")]
    user: String,

    /// Caller address used for rate limiting (defaults to the user)
    #[arg(long, default_value = "")]
    address: String,

    /// Print the metrics report after running
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    if cli.urls.is_empty() && cli.search.is_none() && !cli.metrics {
        bail!("Nothing to do: pass --url, --search or --metrics");
    }

    let coordinator = Coordinator::from_config(&config).context("Failed to start pipeline")?;
    let ctx = CallContext::new(cli.user.as_str(), cli.address.as_str());

    let outcome = run_requests(&coordinator, &cli, &ctx).await;

    if cli.metrics {
        print_report(&coordinator.metrics_snapshot(), &coordinator.performance_metrics());
    }

    outcome
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("product_scout=info,warn"),
            1 => EnvFilter::new("product_scout=debug,info"),
            2 => EnvFilter::new("product_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs whichever scrape or search the flags ask for
async fn run_requests(
    coordinator: &Coordinator,
    cli: &Cli,
    ctx: &CallContext,
) -> anyhow::Result<()> {
    if let Some(query) = &cli.search {
        let products = coordinator
            .search(query, cli.page, ctx)
            .await
            .map_err(|e| report_failure("Search", e))?;
        print_json(&products)?;
    } else if let [url] = cli.urls.as_slice() {
        let product = coordinator
            .scrape(url, ctx)
            .await
            .map_err(|e| report_failure("Scrape", e))?;
        print_json(&product)?;
    } else if !cli.urls.is_empty() {
        let outcome = coordinator
            .bulk_scrape(&cli.urls, ctx)
            .await
            .map_err(|e| report_failure("Bulk scrape", e))?;
        print_json(&outcome)?;
    }

    Ok(())
}

fn report_failure(operation: &str, error: product_scout::ScoutError) -> anyhow::Error {
    if error.is_admission_denied() {
        tracing::warn!("{} rejected: {}", operation, error);
    } else {
        tracing::error!("{} failed ({}): {}", operation, error.kind(), error);
    }
    error.into()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows the effective settings
fn handle_dry_run(config: &Config) {
    println!("=== Product-Scout Dry Run ===\n");

    println!("Admission:");
    println!("  Burst: {}", config.admission.burst);
    println!("  Refill: {}/minute", config.admission.refill_per_minute);
    match config.admission.sweep_policy {
        SweepMode::FullReset => println!(
            "  Sweep: full reset every {}s",
            config.admission.sweep_interval_secs
        ),
        SweepMode::IdleEviction => println!(
            "  Sweep: evict buckets idle for {}s, every {}s",
            config.admission.idle_ttl_secs, config.admission.sweep_interval_secs
        ),
    }

    println!("\nDefault Proxy:");
    println!("  Name: {}", config.default_proxy.name);
    if config.default_proxy.host.is_empty() {
        println!("  Route: direct");
    } else {
        println!(
            "  Route: {}:{}",
            config.default_proxy.host, config.default_proxy.port
        );
        println!(
            "  Credentials: {}",
            if config.default_proxy.username.is_empty() {
                "none"
            } else {
                "configured"
            }
        );
    }

    println!("\nExtraction:");
    println!("  Base URL: {}", config.extraction.base_url);
    println!("  Timeout: {}s", config.extraction.timeout_secs);
    println!("  Bulk delay: {}ms", config.extraction.bulk_delay_ms);
    println!("  Max bulk URLs: {}", config.extraction.max_bulk_urls);
    println!("  Default currency: {}", config.extraction.default_currency);
    println!(
        "  Placeholder reviews: {}",
        if config.extraction.placeholder_reviews {
            "on"
        } else {
            "off"
        }
    );
    match config.extraction.request_deadline_secs {
        Some(secs) => println!("  Request deadline: {}s", secs),
        None => println!("  Request deadline: none"),
    }

    if !config.extraction.rules.is_empty() {
        println!("\nRule Overrides ({}):", config.extraction.rules.len());
        let mut names: Vec<_> = config.extraction.rules.keys().collect();
        names.sort();
        for name in names {
            println!("  - {}", name);
            for selector in &config.extraction.rules[name] {
                println!("    * {}", selector);
            }
        }
    }

    println!("\n✓ Configuration is valid");
}
