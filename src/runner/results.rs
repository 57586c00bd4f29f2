//! Per-run result set and summary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::pain::Undeterminable;

/// Resolved max-pain values in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    values: Vec<(String, Decimal)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; an existing symbol keeps its position.
    pub fn insert(&mut self, symbol: &str, value: Decimal) {
        match self.values.iter_mut().find(|(s, _)| s == symbol) {
            Some(entry) => entry.1 = value,
            None => self.values.push((symbol.to_string(), value)),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        self.values
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.values.iter().map(|(s, v)| (s.as_str(), *v))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the result file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json_pretty()?)
            .with_context(|| format!("writing result file {}", path.display()))?;
        Ok(())
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (symbol, value) in &self.values {
            map.serialize_entry(symbol, &value.to_f64())?;
        }
        map.end()
    }
}

/// What happened to one ticker during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerStatus {
    Cached(Decimal),
    Computed(Decimal),
    NoResult(Undeterminable),
    Disabled,
}

impl TickerStatus {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Cached(v) | Self::Computed(v) => Some(*v),
            Self::NoResult(_) | Self::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerReport {
    pub symbol: String,
    pub status: TickerStatus,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TickerReport>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&TickerStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn cached(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::Cached(_)))
    }

    pub fn computed(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::Computed(_)))
    }

    pub fn no_result(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::NoResult(_)))
    }

    pub fn disabled(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::Disabled))
    }

    /// Tickers that ended with a value.
    pub fn resolved(&self) -> usize {
        self.cached() + self.computed()
    }

    pub fn status(&self, symbol: &str) -> Option<&TickerStatus> {
        self.reports
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.status)
    }
}
