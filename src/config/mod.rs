//! Configuration loading: run settings and the ticker list.

pub mod settings;
pub mod tickers;

pub use settings::{Settings, DEFAULT_PROVIDER_BASE_URL};
pub use tickers::{
    load_tickers, normalize_symbol, normalize_tickers, parse_tickers, Ticker, TickerSpec,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
