//! Sequential per-ticker pipeline: cache gate, fetch, filter, evaluate.
//!
//! Tickers are processed one at a time in list order. Provider failures are
//! logged and turned into a per-ticker "no result"; nothing a single ticker
//! does can abort the run.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::results::{ResultSet, RunSummary, TickerReport, TickerStatus};
use crate::cache::{CacheStore, Resolution};
use crate::config::{Settings, Ticker};
use crate::pain::{PainEvaluator, PainOutcome, Undeterminable};
use crate::provider::ChainProvider;

/// Fetch the nearest chain and evaluate it, normalizing provider errors.
pub async fn fetch_and_evaluate<P: ChainProvider>(
    provider: &mut P,
    evaluator: PainEvaluator,
    symbol: &str,
) -> PainOutcome {
    match provider.fetch_nearest_chain(symbol).await {
        Ok(chain) => evaluator.evaluate(chain.as_ref()),
        Err(e) => {
            warn!(%symbol, "Provider failure: {}", e);
            PainOutcome::Undeterminable(Undeterminable::ProviderFailure(e.to_string()))
        }
    }
}

/// Drives a full run over the ticker list.
pub struct Runner<P: ChainProvider> {
    provider: P,
    evaluator: PainEvaluator,
    ttl: Duration,
    force: bool,
    clock: fn() -> DateTime<Utc>,
}

impl<P: ChainProvider> Runner<P> {
    pub fn new(provider: P, evaluator: PainEvaluator, ttl: Duration) -> Self {
        Self {
            provider,
            evaluator,
            ttl,
            force: false,
            clock: Utc::now,
        }
    }

    pub fn from_settings(provider: P, settings: &Settings) -> Self {
        Self::new(
            provider,
            PainEvaluator::with_min_open_interest(settings.min_open_interest),
            settings.cache_ttl(),
        )
    }

    /// Recompute every enabled ticker regardless of cache freshness.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve one ticker against the cache.
    pub async fn resolve_ticker(&mut self, ticker: &Ticker, cache: &mut CacheStore) -> TickerStatus {
        let symbol = ticker.symbol.as_str();
        if !ticker.enabled {
            info!(%symbol, "Skipped (disabled)");
            return TickerStatus::Disabled;
        }

        let now = (self.clock)();
        let evaluator = self.evaluator;
        let provider = &mut self.provider;

        let resolution = if self.force {
            let outcome = fetch_and_evaluate(provider, evaluator, symbol).await;
            cache.settle(symbol, now, outcome)
        } else {
            cache
                .resolve_async(symbol, self.ttl, now, move |s: String| async move {
                    fetch_and_evaluate(provider, evaluator, &s).await
                })
                .await
        };

        match resolution {
            Resolution::Cached(value) => {
                info!(%symbol, %value, "From cache");
                TickerStatus::Cached(value)
            }
            Resolution::Computed(value) => {
                info!(%symbol, %value, "Max pain computed");
                TickerStatus::Computed(value)
            }
            Resolution::Unresolved(reason) => {
                info!(%symbol, %reason, "No data");
                TickerStatus::NoResult(reason)
            }
        }
    }

    /// Process every ticker in order, filling `results` and updating `cache`.
    pub async fn run<F>(
        &mut self,
        tickers: &[Ticker],
        cache: &mut CacheStore,
        results: &mut ResultSet,
        mut on_ticker: F,
    ) -> RunSummary
    where
        F: FnMut(&TickerReport),
    {
        let mut summary = RunSummary::default();

        for ticker in tickers {
            let status = self.resolve_ticker(ticker, cache).await;
            if let Some(value) = status.value() {
                results.insert(&ticker.symbol, value);
            }

            let report = TickerReport {
                symbol: ticker.symbol.clone(),
                status,
            };
            on_ticker(&report);
            summary.reports.push(report);
        }

        info!(
            "Run complete: {} resolved ({} cached, {} computed), {} without data, {} disabled",
            summary.resolved(),
            summary.cached(),
            summary.computed(),
            summary.no_result(),
            summary.disabled()
        );
        summary
    }
}
