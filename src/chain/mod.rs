pub mod filter;
pub mod types;

pub use filter::{filter_by_open_interest, ChainFilter, DEFAULT_MIN_OPEN_INTEREST};
pub use types::{Chain, OptionRow, OptionSide};
