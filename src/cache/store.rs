//! Time-boxed cache of computed max-pain values.
//!
//! One record per ticker, persisted as a JSON object:
//! `{ "SPY": { "maxPain": 510.0, "ts": "2024-06-20T21:05:00Z" }, ... }`
//!
//! A record is trusted only while `now - ts < ttl`. Records whose timestamp
//! cannot be parsed are kept on disk but always treated as expired.

use std::collections::BTreeMap;
use std::fs;
use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::normalize_symbol;
use crate::pain::{PainOutcome, Undeterminable};

/// Default time-to-live for cached values.
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// Naive timestamp layouts accepted on load (interpreted as UTC).
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a stored timestamp. Accepts RFC 3339 and naive ISO-8601.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Cached max-pain value for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Max-pain strike
    #[serde(rename = "maxPain", alias = "mp", with = "rust_decimal::serde::float")]
    pub max_pain: Decimal,

    /// Computation time as stored on disk
    #[serde(default)]
    pub ts: String,
}

impl CacheRecord {
    pub fn new(max_pain: Decimal, computed_at: DateTime<Utc>) -> Self {
        Self {
            max_pain,
            ts: computed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Parsed computation time, `None` if the stored timestamp is corrupt.
    pub fn computed_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.ts)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.computed_at().map(|t| now - t)
    }

    /// Strictly younger than `ttl`. Corrupt timestamps are never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now).is_some_and(|age| age < ttl)
    }
}

/// How a ticker's value was obtained for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Fresh cache entry reused, no fetch.
    Cached(Decimal),
    /// Fetched, evaluated and written to the cache.
    Computed(Decimal),
    /// Fetched but undeterminable; cache left as it was.
    Unresolved(Undeterminable),
}

impl Resolution {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Cached(v) | Self::Computed(v) => Some(*v),
            Self::Unresolved(_) => None,
        }
    }

    /// True when resolving required a provider call.
    pub fn fetched(&self) -> bool {
        !matches!(self, Self::Cached(_))
    }
}

/// Ticker → cache record mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheStore {
    entries: BTreeMap<String, CacheRecord>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticker: &str) -> Option<&CacheRecord> {
        self.entries.get(ticker)
    }

    /// Insert or overwrite, returning the previous record.
    pub fn insert(&mut self, ticker: &str, record: CacheRecord) -> Option<CacheRecord> {
        self.entries.insert(ticker.to_string(), record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheRecord)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Cached value if the entry exists and is younger than `ttl`.
    pub fn fresh_value(&self, ticker: &str, ttl: Duration, now: DateTime<Utc>) -> Option<Decimal> {
        self.get(ticker)
            .filter(|record| record.is_fresh(now, ttl))
            .map(|record| record.max_pain)
    }

    /// Apply a freshly evaluated outcome. Only determined strikes are stored.
    pub fn settle(&mut self, ticker: &str, now: DateTime<Utc>, outcome: PainOutcome) -> Resolution {
        match outcome {
            PainOutcome::Determined(strike) => {
                self.insert(ticker, CacheRecord::new(strike, now));
                Resolution::Computed(strike)
            }
            PainOutcome::Undeterminable(reason) => Resolution::Unresolved(reason),
        }
    }

    /// Reuse a fresh entry or recompute through `fetch_and_evaluate`.
    pub fn resolve<F>(
        &mut self,
        ticker: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        fetch_and_evaluate: F,
    ) -> Resolution
    where
        F: FnOnce(&str) -> PainOutcome,
    {
        if let Some(value) = self.fresh_value(ticker, ttl, now) {
            return Resolution::Cached(value);
        }
        let outcome = fetch_and_evaluate(ticker);
        self.settle(ticker, now, outcome)
    }

    /// Async variant of [`CacheStore::resolve`] for network-backed fetches.
    pub async fn resolve_async<F, Fut>(
        &mut self,
        ticker: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        fetch_and_evaluate: F,
    ) -> Resolution
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = PainOutcome>,
    {
        if let Some(value) = self.fresh_value(ticker, ttl, now) {
            return Resolution::Cached(value);
        }
        let outcome = fetch_and_evaluate(ticker.to_string()).await;
        self.settle(ticker, now, outcome)
    }

    /// Build a store from cache file contents, validating entry by entry.
    ///
    /// Unparseable JSON yields an empty store. Entries without a usable
    /// `maxPain` are dropped.
    pub fn from_json(content: &str) -> Self {
        let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_str(content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache file is not a JSON object, starting empty: {}", e);
                return Self::default();
            }
        };

        let mut store = Self::default();
        for (key, value) in raw {
            let Some(ticker) = normalize_symbol(&key) else {
                warn!(%key, "Dropping cache entry with blank ticker");
                continue;
            };
            let record = match serde_json::from_value::<CacheRecord>(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(%key, "Dropping malformed cache entry: {}", e);
                    continue;
                }
            };
            if record.computed_at().is_none() {
                debug!(%ticker, ts = %record.ts, "Cache entry has unparseable timestamp");
            }
            // Keys differing only in case or whitespace collapse to the newest record.
            match store.entries.get(&ticker) {
                Some(kept) if kept.computed_at() >= record.computed_at() => {
                    debug!(%key, %ticker, "Dropping older duplicate cache entry");
                }
                _ => {
                    store.entries.insert(ticker, record);
                }
            }
        }
        store
    }

    /// Load from disk. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading cache file {}", path.display()))?;
        Ok(Self::from_json(&content))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("writing cache file {}", path.display()))?;
        Ok(())
    }
}
