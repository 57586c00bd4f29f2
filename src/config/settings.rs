//! Run settings.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or none at all) is a valid configuration. CLI flags override
//! individual fields after loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::cache::DEFAULT_CACHE_TTL_HOURS;
use crate::chain::DEFAULT_MIN_OPEN_INTEREST;
use crate::provider::DEFAULT_COOKIE_URL;

/// Default market-data endpoint.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON ticker list.
    pub ticker_file: PathBuf,
    /// Result file written at the end of a run.
    pub output_file: PathBuf,
    /// Persistent cache file.
    pub cache_file: PathBuf,
    /// How long a cached value stays trusted.
    #[serde(alias = "cacheTTLHours", alias = "cacheTtlHours")]
    pub cache_ttl_hours: u32,
    /// Open-interest floor applied before evaluation.
    #[serde(alias = "minOpenInterest")]
    pub min_open_interest: u64,
    /// Minimum pause between provider requests.
    #[serde(alias = "interCallDelaySeconds")]
    pub inter_call_delay_seconds: f64,
    /// HTTP timeout for a single provider request.
    pub request_timeout_seconds: u64,
    /// Market-data base URL.
    pub provider_base_url: String,
    /// Page visited once per run to obtain the session cookie.
    pub provider_cookie_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ticker_file: PathBuf::from("tickers.json"),
            output_file: PathBuf::from("maxpain.json"),
            cache_file: PathBuf::from("maxpain_cache.json"),
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS as u32,
            min_open_interest: DEFAULT_MIN_OPEN_INTEREST,
            inter_call_delay_seconds: 1.0,
            request_timeout_seconds: 30,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            provider_cookie_url: DEFAULT_COOKIE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Parse and validate TOML settings.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "cache_ttl_hours must be at least 1".to_string(),
            ));
        }
        if !self.inter_call_delay_seconds.is_finite() || self.inter_call_delay_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "inter_call_delay_seconds must be a non-negative number, got {}",
                self.inter_call_delay_seconds
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.cache_ttl_hours))
    }

    pub fn inter_call_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.inter_call_delay_seconds.max(0.0))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}
