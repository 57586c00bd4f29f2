//! Open-interest filter for option chains.
//!
//! Rows below the open-interest floor are dropped from both sides before the
//! pain calculation. Order within each side is preserved and the input chain
//! is never modified.

use serde::{Deserialize, Serialize};

use super::types::{Chain, OptionRow};

/// Default open-interest floor.
pub const DEFAULT_MIN_OPEN_INTEREST: u64 = 10;

/// Liquidity filter applied to a chain before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFilter {
    /// Rows with open interest strictly below this are dropped.
    pub min_open_interest: u64,
}

impl Default for ChainFilter {
    fn default() -> Self {
        Self {
            min_open_interest: DEFAULT_MIN_OPEN_INTEREST,
        }
    }
}

impl ChainFilter {
    pub fn new(min_open_interest: u64) -> Self {
        Self { min_open_interest }
    }

    /// Apply the filter, returning a new chain.
    pub fn apply(&self, chain: &Chain) -> Chain {
        filter_by_open_interest(chain, self.min_open_interest)
    }
}

/// Keep only rows with `open_interest >= min_open_interest`.
///
/// An empty result on both sides is valid and means the chain carries no
/// usable data.
pub fn filter_by_open_interest(chain: &Chain, min_open_interest: u64) -> Chain {
    let keep = |rows: &[OptionRow]| -> Vec<OptionRow> {
        rows.iter()
            .filter(|r| r.open_interest >= min_open_interest)
            .copied()
            .collect()
    };

    Chain {
        expiry: chain.expiry,
        calls: keep(&chain.calls),
        puts: keep(&chain.puts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_chain() -> Chain {
        Chain::from_pairs(
            NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            &[(dec!(90), 50), (dec!(95), 9), (dec!(100), 10), (dec!(105), 0)],
            &[(dec!(95), 11), (dec!(100), 3), (dec!(105), 200)],
        )
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filtered = filter_by_open_interest(&sample_chain(), 10);
        let call_strikes: Vec<_> = filtered.calls.iter().map(|r| r.strike).collect();
        let put_strikes: Vec<_> = filtered.puts.iter().map(|r| r.strike).collect();

        assert_eq!(call_strikes, vec![dec!(90), dec!(100)]);
        assert_eq!(put_strikes, vec![dec!(95), dec!(105)]);
    }

    #[test]
    fn test_expiry_unchanged_and_input_untouched() {
        let chain = sample_chain();
        let filtered = ChainFilter::new(100).apply(&chain);

        assert_eq!(filtered.expiry, chain.expiry);
        assert_eq!(filtered.puts.len(), 1);
        assert!(filtered.calls.is_empty());
        assert_eq!(chain.total_rows(), 7);
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        let chain = sample_chain();
        assert_eq!(filter_by_open_interest(&chain, 0), chain);
    }

    #[test]
    fn test_all_rows_filtered_gives_empty_chain() {
        let chain = Chain::from_pairs(
            NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            &[(dec!(100), 5)],
            &[(dec!(100), 5)],
        );
        let filtered = ChainFilter::default().apply(&chain);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_monotonic_in_threshold() {
        let chain = sample_chain();
        let thresholds = [0u64, 1, 9, 10, 11, 50, 200, 201];

        for (i, &t1) in thresholds.iter().enumerate() {
            for &t2 in &thresholds[i..] {
                let loose = filter_by_open_interest(&chain, t1);
                let strict = filter_by_open_interest(&chain, t2);
                assert!(strict.calls.iter().all(|r| loose.calls.contains(r)));
                assert!(strict.puts.iter().all(|r| loose.puts.contains(r)));
            }
        }
    }
}
