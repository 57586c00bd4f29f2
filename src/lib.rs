pub mod cache;
pub mod chain;
pub mod config;
pub mod pain;
pub mod provider;
pub mod runner;

// Re-export commonly used types
pub use cache::{CacheRecord, CacheStore, Resolution};
pub use chain::{Chain, ChainFilter, OptionRow, OptionSide};
pub use config::{Settings, Ticker, TickerSpec};
pub use pain::{PainEvaluator, PainOutcome, StrikePain, Undeterminable};
pub use provider::{ChainProvider, ProviderError, YahooClient};
pub use runner::{ResultSet, RunSummary, Runner, TickerStatus};
