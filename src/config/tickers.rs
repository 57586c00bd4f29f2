//! Ticker list loading.
//!
//! The ticker file is a JSON array whose entries are either bare symbols or
//! objects with an `enabled` flag:
//!
//! ```json
//! ["SPY", {"symbol": "QQQ"}, {"symbol": "XYZ", "enabled": false}]
//! ```
//!
//! Entries are normalized to [`Ticker`] here so nothing downstream has to
//! care which shape was used.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ConfigError;

fn default_enabled() -> bool {
    true
}

/// One entry of the ticker file as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TickerSpec {
    Symbol(String),
    Detailed {
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

/// Normalized ticker entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub enabled: bool,
}

impl Ticker {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            enabled: true,
        }
    }

    pub fn disabled(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            enabled: false,
        }
    }
}

impl TickerSpec {
    /// Normalize to a [`Ticker`]. `None` when the symbol is missing or blank.
    pub fn normalize(self) -> Option<Ticker> {
        let (symbol, enabled) = match self {
            Self::Symbol(symbol) => (symbol, true),
            Self::Detailed { symbol, enabled } => (symbol?, enabled),
        };
        Some(Ticker {
            symbol: normalize_symbol(&symbol)?,
            enabled,
        })
    }
}

/// Trimmed, upper-cased symbol; `None` when blank.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    (!symbol.is_empty()).then_some(symbol)
}

/// Normalize raw specs, dropping blanks and later duplicates.
pub fn normalize_tickers(specs: Vec<TickerSpec>) -> Vec<Ticker> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::with_capacity(specs.len());

    for (idx, spec) in specs.into_iter().enumerate() {
        let Some(ticker) = spec.normalize() else {
            warn!("Ticker entry {} has no symbol, skipping", idx);
            continue;
        };
        if !seen.insert(ticker.symbol.clone()) {
            warn!("Duplicate ticker {} at entry {}, keeping the first", ticker.symbol, idx);
            continue;
        }
        tickers.push(ticker);
    }
    tickers
}

/// Parse ticker file contents.
pub fn parse_tickers(content: &str) -> Result<Vec<Ticker>, ConfigError> {
    let specs: Vec<TickerSpec> = serde_json::from_str(content)?;
    Ok(normalize_tickers(specs))
}

/// Read and parse the ticker file.
pub fn load_tickers(path: &Path) -> Result<Vec<Ticker>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_tickers(&content)
}
