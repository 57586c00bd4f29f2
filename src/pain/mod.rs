//! Max-pain evaluation.
//!
//! Provides:
//! - Per-strike holder payout (pain curve)
//! - Max-pain strike selection with lowest-strike tie-break
//! - Outcome types naming why a ticker produced no strike

pub mod evaluator;

pub use evaluator::{
    evaluate, min_pain, pain_at, pain_curve, PainEvaluator, PainOutcome, StrikePain,
    Undeterminable,
};
