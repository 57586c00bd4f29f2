//! Option chain types used by the max-pain pipeline.
//!
//! A chain holds only what the pain calculation needs: the strike and the
//! open interest of every contract on each side of a single expiry.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of the chain a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

/// A single contract line: strike and its outstanding open interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRow {
    /// Strike price
    pub strike: Decimal,

    /// Open interest (contracts outstanding)
    pub open_interest: u64,
}

impl OptionRow {
    /// Create a row. The strike is normalized so `100.0` and `100` compare equal.
    pub fn new(strike: Decimal, open_interest: u64) -> Self {
        Self {
            strike: strike.normalize(),
            open_interest,
        }
    }
}

/// Calls and puts for one expiration date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chain {
    /// Expiration date for this chain
    pub expiry: NaiveDate,

    /// Call rows in provider order
    pub calls: Vec<OptionRow>,

    /// Put rows in provider order
    pub puts: Vec<OptionRow>,
}

impl Chain {
    /// Create a new empty chain.
    pub fn new(expiry: NaiveDate) -> Self {
        Self {
            expiry,
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    /// Build a chain from `(strike, open_interest)` pairs.
    pub fn from_pairs(
        expiry: NaiveDate,
        calls: &[(Decimal, u64)],
        puts: &[(Decimal, u64)],
    ) -> Self {
        Self {
            expiry,
            calls: calls.iter().map(|&(k, oi)| OptionRow::new(k, oi)).collect(),
            puts: puts.iter().map(|&(k, oi)| OptionRow::new(k, oi)).collect(),
        }
    }

    /// Add a row to the appropriate side.
    pub fn add_row(&mut self, side: OptionSide, row: OptionRow) {
        match side {
            OptionSide::Call => self.calls.push(row),
            OptionSide::Put => self.puts.push(row),
        }
    }

    /// Distinct strikes across both sides, ascending.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<_> = self
            .calls
            .iter()
            .chain(self.puts.iter())
            .map(|r| r.strike)
            .collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    /// True when neither side has any rows.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    /// Total number of rows on both sides.
    pub fn total_rows(&self) -> usize {
        self.calls.len() + self.puts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 21).unwrap()
    }

    #[test]
    fn test_option_side_labels() {
        assert_eq!(OptionSide::Call.as_str(), "C");
        assert_eq!(OptionSide::Put.as_str(), "P");
    }

    #[test]
    fn test_strikes_are_distinct_and_sorted() {
        let chain = Chain::from_pairs(
            expiry(),
            &[(dec!(105), 10), (dec!(95), 20)],
            &[(dec!(100), 5), (dec!(95.0), 7)],
        );
        assert_eq!(chain.strikes(), vec![dec!(95), dec!(100), dec!(105)]);
    }

    #[test]
    fn test_row_strike_normalized() {
        assert_eq!(OptionRow::new(dec!(100.00), 1), OptionRow::new(dec!(100), 1));
    }

    #[test]
    fn test_add_row_routes_by_side() {
        let mut chain = Chain::new(expiry());
        assert!(chain.is_empty());

        chain.add_row(OptionSide::Call, OptionRow::new(dec!(50), 3));
        chain.add_row(OptionSide::Put, OptionRow::new(dec!(45), 4));
        chain.add_row(OptionSide::Put, OptionRow::new(dec!(40), 6));

        assert!(!chain.is_empty());
        assert_eq!(chain.total_rows(), 3);
        assert_eq!(chain.calls, vec![OptionRow::new(dec!(50), 3)]);
        assert_eq!(
            chain.puts,
            vec![OptionRow::new(dec!(45), 4), OptionRow::new(dec!(40), 6)]
        );
    }
}
