//! Max-pain strike evaluation.
//!
//! For every distinct strike `k` in the chain the settlement payout to option
//! holders is computed as if the underlying expired exactly at `k`:
//! - calls struck below `k` pay `open_interest * (k - strike)`
//! - puts struck above `k` pay `open_interest * (strike - k)`
//!
//! The max-pain strike is the candidate with the smallest total payout. Ties
//! resolve to the lowest strike. All arithmetic is exact `Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::{Chain, ChainFilter};

/// Why no max-pain strike could be produced for a ticker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Undeterminable {
    #[error("no options listed")]
    NoOptionsListed,

    #[error("no rows at or above the open-interest floor")]
    EmptyFilteredChain,

    #[error("pain total out of decimal range")]
    PainOverflow,

    #[error("provider failure: {0}")]
    ProviderFailure(String),
}

/// Result of evaluating one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PainOutcome {
    Determined(Decimal),
    Undeterminable(Undeterminable),
}

impl PainOutcome {
    /// The max-pain strike, if one was determined.
    pub fn strike(&self) -> Option<Decimal> {
        match self {
            Self::Determined(strike) => Some(*strike),
            Self::Undeterminable(_) => None,
        }
    }
}

/// Aggregate holder payout if the underlying settles at `strike`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikePain {
    pub strike: Decimal,
    pub call_pain: Decimal,
    pub put_pain: Decimal,
    pub total_pain: Decimal,
}

/// `Σ open_interest * distance` over the rows, `None` on overflow.
fn side_pain(mut rows: impl Iterator<Item = (u64, Decimal, Decimal)>) -> Option<Decimal> {
    rows.try_fold(Decimal::ZERO, |acc, (open_interest, from, to)| {
        let distance = from.checked_sub(to)?;
        let pain = Decimal::from(open_interest).checked_mul(distance)?;
        acc.checked_add(pain)
    })
}

/// Payout to holders if settlement lands on `settle`.
pub fn pain_at(chain: &Chain, settle: Decimal) -> Result<StrikePain, Undeterminable> {
    let call_pain = side_pain(
        chain
            .calls
            .iter()
            .filter(|r| r.strike < settle)
            .map(|r| (r.open_interest, settle, r.strike)),
    );
    let put_pain = side_pain(
        chain
            .puts
            .iter()
            .filter(|r| r.strike > settle)
            .map(|r| (r.open_interest, r.strike, settle)),
    );

    match (call_pain, put_pain) {
        (Some(call_pain), Some(put_pain)) => Ok(StrikePain {
            strike: settle,
            call_pain,
            put_pain,
            total_pain: call_pain
                .checked_add(put_pain)
                .ok_or(Undeterminable::PainOverflow)?,
        }),
        _ => Err(Undeterminable::PainOverflow),
    }
}

/// Pain at every distinct strike of the chain, ascending by strike.
pub fn pain_curve(chain: &Chain) -> Result<Vec<StrikePain>, Undeterminable> {
    chain
        .strikes()
        .into_iter()
        .map(|k| pain_at(chain, k))
        .collect()
}

/// Candidate with minimal total pain; first (lowest) strike wins ties.
pub fn min_pain(chain: &Chain) -> Result<Option<StrikePain>, Undeterminable> {
    let mut best: Option<StrikePain> = None;
    for point in pain_curve(chain)? {
        match best {
            Some(b) if point.total_pain >= b.total_pain => {}
            _ => best = Some(point),
        }
    }
    Ok(best)
}

/// Max-pain strike of an already filtered chain.
///
/// `None` when the chain has no rows or its pain totals leave decimal range.
pub fn evaluate(chain: &Chain) -> Option<Decimal> {
    min_pain(chain).ok().flatten().map(|p| p.strike)
}

/// Filters a fetched chain and evaluates it, naming the reason on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PainEvaluator {
    filter: ChainFilter,
}

impl PainEvaluator {
    pub fn new(filter: ChainFilter) -> Self {
        Self { filter }
    }

    pub fn with_min_open_interest(min_open_interest: u64) -> Self {
        Self::new(ChainFilter::new(min_open_interest))
    }

    pub fn filter(&self) -> &ChainFilter {
        &self.filter
    }

    /// Evaluate a fetched chain; `None` means the symbol lists no options.
    pub fn evaluate(&self, chain: Option<&Chain>) -> PainOutcome {
        let Some(chain) = chain else {
            return PainOutcome::Undeterminable(Undeterminable::NoOptionsListed);
        };
        match min_pain(&self.filter.apply(chain)) {
            Ok(Some(point)) => PainOutcome::Determined(point.strike),
            Ok(None) => PainOutcome::Undeterminable(Undeterminable::EmptyFilteredChain),
            Err(reason) => PainOutcome::Undeterminable(reason),
        }
    }

    /// Pain curve of the filtered chain.
    pub fn curve(&self, chain: &Chain) -> Result<Vec<StrikePain>, Undeterminable> {
        pain_curve(&self.filter.apply(chain))
    }
}
