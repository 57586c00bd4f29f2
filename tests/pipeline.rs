use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use max_pain::cache::CacheStore;
use max_pain::chain::Chain;
use max_pain::config::{load_tickers, Settings};
use max_pain::provider::{ChainProvider, ProviderError};
use max_pain::runner::{ResultSet, Runner, TickerStatus};
use max_pain::Undeterminable;

/// In-memory provider that records every symbol it is asked for.
#[derive(Default)]
struct ReplayProvider {
    chains: HashMap<String, Option<Chain>>,
    requested: Vec<String>,
}

impl ReplayProvider {
    fn with(mut self, symbol: &str, chain: Option<Chain>) -> Self {
        self.chains.insert(symbol.to_string(), chain);
        self
    }
}

#[async_trait]
impl ChainProvider for ReplayProvider {
    async fn fetch_nearest_chain(&mut self, symbol: &str) -> Result<Option<Chain>, ProviderError> {
        self.requested.push(symbol.to_string());
        match self.chains.get(symbol) {
            Some(chain) => Ok(chain.clone()),
            None => Err(ProviderError::InvalidResponse("connection reset".into())),
        }
    }
}

fn chain(calls: &[(Decimal, u64)], puts: &[(Decimal, u64)]) -> Chain {
    Chain::from_pairs(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(), calls, puts)
}

fn provider() -> ReplayProvider {
    ReplayProvider::default()
        .with(
            "SPY",
            Some(chain(
                &[(dec!(500), 1000), (dec!(505), 400), (dec!(510), 3)],
                &[(dec!(495), 600), (dec!(500), 900), (dec!(505), 50)],
            )),
        )
        .with("SIMPLE", Some(chain(&[(dec!(95), 100)], &[(dec!(105), 100)])))
        .with("THIN", Some(chain(&[(dec!(100), 5)], &[(dec!(100), 5)])))
        .with("NOOPT", None)
}

fn day_one() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 20, 21, 0, 0).unwrap()
}

fn day_one_later() -> DateTime<Utc> {
    day_one() + Duration::hours(23)
}

fn day_two() -> DateTime<Utc> {
    day_one() + Duration::hours(24)
}

fn workdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("max-pain-it-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn test_daily_runs_reuse_then_refresh_cache() {
    let dir = workdir("daily");
    let ticker_file = dir.join("tickers.json");
    fs::write(
        &ticker_file,
        r#"["SPY", {"symbol": "SIMPLE"}, {"symbol": "XYZ", "enabled": false}, "THIN", "NOOPT", "BROKEN"]"#,
    )
    .unwrap();

    let settings = Settings {
        ticker_file: ticker_file.clone(),
        output_file: dir.join("out").join("maxpain.json"),
        cache_file: dir.join("maxpain_cache.json"),
        ..Settings::default()
    };
    let tickers = load_tickers(&settings.ticker_file).unwrap();
    assert_eq!(tickers.len(), 6);

    // First run: everything enabled is fetched.
    let mut runner = Runner::from_settings(provider(), &settings).with_clock(day_one);
    let mut cache = CacheStore::load(&settings.cache_file).unwrap();
    let mut results = ResultSet::new();
    let summary = runner.run(&tickers, &mut cache, &mut results, |_| {}).await;

    assert_eq!(
        runner.provider().requested,
        vec!["SPY", "SIMPLE", "THIN", "NOOPT", "BROKEN"]
    );
    // SPY after the OI floor: pain(495)=5000, pain(500)=250, pain(505)=5000.
    assert_eq!(summary.status("SPY"), Some(&TickerStatus::Computed(dec!(500))));
    assert_eq!(summary.status("SIMPLE"), Some(&TickerStatus::Computed(dec!(95))));
    assert_eq!(summary.status("XYZ"), Some(&TickerStatus::Disabled));
    assert_eq!(
        summary.status("THIN"),
        Some(&TickerStatus::NoResult(Undeterminable::EmptyFilteredChain))
    );
    assert_eq!(
        summary.status("NOOPT"),
        Some(&TickerStatus::NoResult(Undeterminable::NoOptionsListed))
    );
    assert!(matches!(
        summary.status("BROKEN"),
        Some(TickerStatus::NoResult(Undeterminable::ProviderFailure(_)))
    ));

    results.save(&settings.output_file).unwrap();
    cache.save(&settings.cache_file).unwrap();

    let output: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&settings.output_file).unwrap()).unwrap();
    let output = output.as_object().unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output["SPY"].as_f64(), Some(500.0));
    assert_eq!(output["SIMPLE"].as_f64(), Some(95.0));

    // Same day: served from cache, no fetch for resolved tickers.
    let mut runner = Runner::from_settings(provider(), &settings).with_clock(day_one_later);
    let mut cache = CacheStore::load(&settings.cache_file).unwrap();
    assert_eq!(cache.len(), 2);
    let mut results = ResultSet::new();
    let summary = runner.run(&tickers, &mut cache, &mut results, |_| {}).await;

    assert_eq!(runner.provider().requested, vec!["THIN", "NOOPT", "BROKEN"]);
    assert_eq!(summary.cached(), 2);
    assert_eq!(results.get("SPY"), Some(dec!(500)));

    // Exactly one TTL later the entries are expired and recomputed.
    let mut runner = Runner::from_settings(provider(), &settings).with_clock(day_two);
    let mut results = ResultSet::new();
    let summary = runner.run(&tickers, &mut cache, &mut results, |_| {}).await;

    assert_eq!(summary.cached(), 0);
    assert_eq!(summary.computed(), 2);
    assert_eq!(cache.get("SPY").unwrap().computed_at(), Some(day_two()));

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_failed_refresh_keeps_stale_entry() {
    let dir = workdir("stale");
    let cache_file = dir.join("cache.json");
    fs::write(
        &cache_file,
        r#"{"NOOPT": {"maxPain": 42.5, "ts": "2024-06-01T00:00:00"}, "BROKEN": {"maxPain": 7, "ts": "??"}}"#,
    )
    .unwrap();

    let settings = Settings::default();
    let mut cache = CacheStore::load(&cache_file).unwrap();
    let before = cache.clone();

    let tickers = max_pain::config::parse_tickers(r#"["NOOPT", "BROKEN"]"#).unwrap();
    let mut runner = Runner::from_settings(provider(), &settings).with_clock(day_one);
    let mut results = ResultSet::new();
    let summary = runner.run(&tickers, &mut cache, &mut results, |_| {}).await;

    assert_eq!(summary.no_result(), 2);
    assert!(results.is_empty());
    assert_eq!(cache, before);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_out_of_range_chain_does_not_stop_the_run() {
    let provider = provider().with(
        "HUGE",
        Some(chain(
            &[(dec!(0.5), 9_000_000_000_000_000_000)],
            &[(dec!(100000000000), 10)],
        )),
    );
    let tickers = max_pain::config::parse_tickers(r#"["HUGE", "SIMPLE"]"#).unwrap();
    let mut runner = Runner::from_settings(provider, &Settings::default()).with_clock(day_one);
    let mut cache = CacheStore::new();
    let mut results = ResultSet::new();
    let summary = runner.run(&tickers, &mut cache, &mut results, |_| {}).await;

    assert_eq!(
        summary.status("HUGE"),
        Some(&TickerStatus::NoResult(Undeterminable::PainOverflow))
    );
    assert_eq!(summary.status("SIMPLE"), Some(&TickerStatus::Computed(dec!(95))));
    assert_eq!(results.len(), 1);
    assert!(cache.get("HUGE").is_none());
}
