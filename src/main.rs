//! Max-pain calculator CLI.
//!
//! # Usage
//!
//! ```bash
//! # Daily run over the ticker list (cache + result file)
//! max-pain run
//!
//! # Custom files and knobs
//! max-pain --config config/max-pain.toml run --tickers tickers.json --ttl-hours 12
//!
//! # Inspect one symbol's nearest chain and pain curve
//! max-pain chain SPY
//!
//! # Show cache entries and their freshness
//! max-pain cache
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use max_pain::cache::CacheStore;
use max_pain::config::{load_tickers, Settings};
use max_pain::pain::{PainEvaluator, PainOutcome};
use max_pain::provider::{ChainProvider, YahooClient};
use max_pain::runner::{ResultSet, Runner, TickerStatus};

const SEPARATOR: &str = "============================================================";

/// Max-pain strike calculator.
#[derive(Parser)]
#[command(name = "max-pain")]
#[command(about = "Compute max-pain strikes for the nearest option expiry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every configured ticker and write results and cache
    Run {
        /// Ticker list (JSON)
        #[arg(long)]
        tickers: Option<PathBuf>,

        /// Result file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Cache file
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Cache time-to-live in hours
        #[arg(long)]
        ttl_hours: Option<u32>,

        /// Open-interest floor
        #[arg(long)]
        min_oi: Option<u64>,

        /// Pause between provider requests in seconds
        #[arg(long)]
        delay: Option<f64>,

        /// Recompute even when the cache is fresh
        #[arg(long)]
        force: bool,
    },

    /// Print the pain curve of one symbol's nearest expiry
    Chain {
        /// Underlying symbol
        symbol: String,

        /// Open-interest floor
        #[arg(long)]
        min_oi: Option<u64>,
    },

    /// List cache entries and whether they are still fresh
    Cache {
        /// Cache file
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn client_for(settings: &Settings) -> Result<YahooClient> {
    YahooClient::new(
        &settings.provider_base_url,
        settings.inter_call_delay(),
        settings.request_timeout(),
    )
    .map(|client| client.with_cookie_url(&settings.provider_cookie_url))
    .context("building market-data client")
}

async fn cmd_run(settings: Settings, force: bool) -> Result<()> {
    let tickers = load_tickers(&settings.ticker_file)
        .with_context(|| format!("loading tickers from {}", settings.ticker_file.display()))?;

    let mut cache = CacheStore::load(&settings.cache_file).unwrap_or_else(|e| {
        warn!("Ignoring unreadable cache: {:#}", e);
        CacheStore::default()
    });

    let mut runner = Runner::from_settings(client_for(&settings)?, &settings).with_force(force);
    let mut results = ResultSet::new();

    let pb = ProgressBar::new(tickers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let summary = runner
        .run(&tickers, &mut cache, &mut results, |report| {
            let msg = match &report.status {
                TickerStatus::Cached(v) => format!("{}: {} (cache)", report.symbol, v),
                TickerStatus::Computed(v) => format!("{}: {}", report.symbol, v),
                TickerStatus::NoResult(reason) => format!("{}: {}", report.symbol, reason),
                TickerStatus::Disabled => format!("{}: disabled", report.symbol),
            };
            pb.set_message(msg);
            pb.inc(1);
        })
        .await;
    pb.finish_with_message("done");
    info!(requests = runner.provider().request_count(), "Provider requests issued");

    results.save(&settings.output_file)?;
    cache.save(&settings.cache_file)?;

    println!(
        "\nDone: {} values in {} ({} cached, {} computed, {} without data, {} disabled)",
        results.len(),
        settings.output_file.display(),
        summary.cached(),
        summary.computed(),
        summary.no_result(),
        summary.disabled()
    );
    Ok(())
}

async fn cmd_chain(settings: Settings, symbol: &str) -> Result<()> {
    let mut client = client_for(&settings)?;
    let evaluator = PainEvaluator::with_min_open_interest(settings.min_open_interest);
    let symbol = symbol.trim().to_uppercase();

    let chain = client
        .fetch_nearest_chain(&symbol)
        .await
        .with_context(|| format!("fetching option chain for {}", symbol))?;

    println!("{}", SEPARATOR);
    println!("{} max pain", symbol);
    println!("{}", SEPARATOR);

    let Some(chain) = chain else {
        println!("No options listed.");
        return Ok(());
    };

    let filtered = evaluator.filter().apply(&chain);
    println!("  Expiry: {}", chain.expiry);
    println!(
        "  Rows: {} ({} calls, {} puts), {} with OI >= {}",
        chain.total_rows(),
        chain.calls.len(),
        chain.puts.len(),
        filtered.total_rows(),
        evaluator.filter().min_open_interest
    );
    if filtered.is_empty() {
        println!("  Every row is below the open-interest floor.");
    }

    match evaluator.curve(&chain) {
        Ok(curve) if !curve.is_empty() => {
            println!("\n  {:>12} {:>16} {:>16} {:>16}", "strike", "call pain", "put pain", "total");
            for point in &curve {
                println!(
                    "  {:>12} {:>16} {:>16} {:>16}",
                    point.strike, point.call_pain, point.put_pain, point.total_pain
                );
            }
        }
        Ok(_) => {}
        Err(reason) => println!("\n  Pain curve unavailable: {}", reason),
    }

    match evaluator.evaluate(Some(&chain)) {
        PainOutcome::Determined(strike) => println!("\n  Max pain: {}", strike),
        PainOutcome::Undeterminable(reason) => println!("\n  Max pain: undeterminable ({})", reason),
    }
    println!("{}", SEPARATOR);
    Ok(())
}

fn cmd_cache(settings: Settings) -> Result<()> {
    let cache = CacheStore::load(&settings.cache_file)?;
    let now = Utc::now();
    let ttl = settings.cache_ttl();

    println!("{} ({} entries, ttl {}h)", settings.cache_file.display(), cache.len(), settings.cache_ttl_hours);
    for (ticker, record) in cache.iter() {
        let age = match record.age(now) {
            Some(age) => format!("{}h{:02}m", age.num_hours(), age.num_minutes() % 60),
            None => "invalid ts".to_string(),
        };
        let state = if record.is_fresh(now, ttl) { "fresh" } else { "stale" };
        println!("  {:<8} {:>12} {:>10} {}", ticker, record.max_pain, age, state);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("max_pain=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            tickers,
            output,
            cache,
            ttl_hours,
            min_oi,
            delay,
            force,
        } => {
            if let Some(p) = tickers {
                settings.ticker_file = p;
            }
            if let Some(p) = output {
                settings.output_file = p;
            }
            if let Some(p) = cache {
                settings.cache_file = p;
            }
            if let Some(h) = ttl_hours {
                settings.cache_ttl_hours = h;
            }
            if let Some(oi) = min_oi {
                settings.min_open_interest = oi;
            }
            if let Some(d) = delay {
                settings.inter_call_delay_seconds = d;
            }
            settings.validate()?;
            cmd_run(settings, force).await?;
        }
        Commands::Chain { symbol, min_oi } => {
            if let Some(oi) = min_oi {
                settings.min_open_interest = oi;
            }
            cmd_chain(settings, &symbol).await?;
        }
        Commands::Cache { cache } => {
            if let Some(p) = cache {
                settings.cache_file = p;
            }
            cmd_cache(settings)?;
        }
    }

    Ok(())
}
