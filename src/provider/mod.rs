//! Market-data providers for option chains.

pub mod yahoo;

pub use yahoo::{
    OptionChainResponse, OptionChainResult, RawContract, YahooClient, DEFAULT_COOKIE_URL,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::chain::Chain;

/// Provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Source of nearest-expiry option chains.
#[async_trait]
pub trait ChainProvider: Send {
    /// Chain for the soonest listed expiration, `Ok(None)` if the symbol has
    /// no listed options.
    async fn fetch_nearest_chain(&mut self, symbol: &str) -> Result<Option<Chain>, ProviderError>;
}
