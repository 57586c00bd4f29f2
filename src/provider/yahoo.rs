//! Yahoo Finance options client.
//!
//! Endpoint: `GET {base}/v7/finance/options/{symbol}[?date=<unix>]`
//!
//! The default response lists every expiration date but embeds contracts for
//! a single one. If that is not the soonest listed expiration, a second
//! request pins `date` to it. Every options request carries a `crumb`
//! obtained once per client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{ChainProvider, ProviderError};
use crate::chain::{Chain, OptionRow, OptionSide};

const USER_AGENT: &str = concat!("max-pain/", env!("CARGO_PKG_VERSION"));

/// Page that hands out the session cookie the crumb is tied to.
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Top-level response: `{"optionChain": {...}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainResponse {
    pub option_chain: OptionChainEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionChainEnvelope {
    #[serde(default)]
    pub result: Vec<OptionChainResult>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Chain listing for one underlying.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainResult {
    #[serde(default)]
    pub underlying_symbol: Option<String>,
    /// Listed expirations as unix seconds
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    #[serde(default)]
    pub options: Vec<ExpiryContracts>,
}

/// Contracts for one expiration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryContracts {
    pub expiration_date: i64,
    #[serde(default)]
    pub calls: Vec<RawContract>,
    #[serde(default)]
    pub puts: Vec<RawContract>,
}

/// Single contract row. Only the fields the pain calculation uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    pub strike: f64,
    #[serde(default)]
    pub open_interest: Option<i64>,
}

impl RawContract {
    /// Convert to a row. Missing or negative open interest counts as zero.
    pub fn to_row(&self) -> Option<OptionRow> {
        let strike = Decimal::try_from(self.strike).ok()?;
        let open_interest = self.open_interest.unwrap_or(0).max(0) as u64;
        Some(OptionRow::new(strike, open_interest))
    }
}

fn expiry_from_unix(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

impl ExpiryContracts {
    pub fn to_chain(&self) -> Result<Chain, ProviderError> {
        let expiry = expiry_from_unix(self.expiration_date).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "expiration out of range: {}",
                self.expiration_date
            ))
        })?;

        let mut chain = Chain::new(expiry);
        for (side, rows) in [(OptionSide::Call, &self.calls), (OptionSide::Put, &self.puts)] {
            for raw in rows {
                match raw.to_row() {
                    Some(row) => chain.add_row(side, row),
                    None => debug!("Dropping {} row with strike {}", side.as_str(), raw.strike),
                }
            }
        }
        Ok(chain)
    }
}

impl OptionChainResult {
    /// Soonest listed expiration.
    pub fn nearest_expiration(&self) -> Option<i64> {
        self.expiration_dates.iter().copied().min()
    }

    /// Embedded contracts for `expiration`, if present.
    pub fn contracts_for(&self, expiration: i64) -> Option<&ExpiryContracts> {
        self.options.iter().find(|o| o.expiration_date == expiration)
    }
}

impl OptionChainResponse {
    /// Unwrap the envelope. `Ok(None)` when the provider knows nothing.
    pub fn into_result(self) -> Result<Option<OptionChainResult>, ProviderError> {
        if let Some(err) = self.option_chain.error {
            return Err(ProviderError::ApiError(format!(
                "{}: {}",
                err.code.unwrap_or_else(|| "error".to_string()),
                err.description.unwrap_or_default()
            )));
        }
        Ok(self.option_chain.result.into_iter().next())
    }
}

/// Rate-limited Yahoo options client.
///
/// Yahoo only answers options requests that carry a session cookie and the
/// matching crumb. The first request of a client visits `cookie_url` to
/// collect the cookie, then fetches the crumb from `/v1/test/getcrumb`. A
/// rejected crumb is refreshed once per request.
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Option<String>,
    min_interval: Duration,
    last_request: Option<Instant>,
    request_count: u64,
}

impl YahooClient {
    /// Create a client. `min_interval` spaces consecutive requests.
    pub fn new(
        base_url: &str,
        min_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            crumb: None,
            min_interval,
            last_request: None,
            request_count: 0,
        })
    }

    /// Override the page visited to obtain the session cookie.
    pub fn with_cookie_url(mut self, cookie_url: &str) -> Self {
        self.cookie_url = cookie_url.to_string();
        self
    }

    /// Get request count for monitoring.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    fn options_url(&self, symbol: &str) -> String {
        format!("{}/v7/finance/options/{}", self.base_url, symbol)
    }

    fn crumb_url(&self) -> String {
        format!("{}/v1/test/getcrumb", self.base_url)
    }

    /// Send one request, keeping at least `min_interval` since the previous one.
    async fn send(&mut self, request: RequestBuilder) -> Result<Response, ProviderError> {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        let response = request.send().await;

        self.last_request = Some(Instant::now());
        self.request_count += 1;

        Ok(response?)
    }

    /// Current crumb, running the cookie handshake first if there is none.
    async fn ensure_crumb(&mut self) -> Result<String, ProviderError> {
        if let Some(crumb) = &self.crumb {
            return Ok(crumb.clone());
        }

        // The cookie page answers 404 but still sets the session cookie.
        let request = self.client.get(&self.cookie_url);
        match self.send(request).await {
            Ok(response) => debug!(status = %response.status(), "Visited cookie page"),
            Err(e) => debug!("Cookie page unreachable: {}", e),
        }

        let request = self.client.get(self.crumb_url());
        let response = self.send(request).await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "crumb request failed: {}: {}",
                status, text
            )));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(ProviderError::InvalidResponse(
                "crumb endpoint returned no crumb".to_string(),
            ));
        }
        debug!("Obtained crumb");
        self.crumb = Some(crumb.clone());
        Ok(crumb)
    }

    /// Rate-limited options request.
    async fn request_options(
        &mut self,
        symbol: &str,
        expiration: Option<i64>,
    ) -> Result<Option<OptionChainResult>, ProviderError> {
        let mut refreshed = false;
        loop {
            let crumb = self.ensure_crumb().await?;
            let mut query = vec![("crumb", crumb)];
            if let Some(date) = expiration {
                query.push(("date", date.to_string()));
            }

            debug!(%symbol, ?expiration, "Requesting option chain");
            let request = self.client.get(self.options_url(symbol)).query(&query);
            let response = self.send(request).await?;

            match response.status() {
                StatusCode::UNAUTHORIZED if !refreshed => {
                    debug!(%symbol, "Crumb rejected, refreshing session");
                    self.crumb = None;
                    refreshed = true;
                    continue;
                }
                StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimitExceeded),
                status if !status.is_success() => {
                    let text = response.text().await.unwrap_or_default();
                    return Err(ProviderError::ApiError(format!("{}: {}", status, text)));
                }
                _ => {}
            }

            let body: OptionChainResponse = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;
            return body.into_result();
        }
    }
}

#[async_trait]
impl ChainProvider for YahooClient {
    async fn fetch_nearest_chain(&mut self, symbol: &str) -> Result<Option<Chain>, ProviderError> {
        let Some(listing) = self.request_options(symbol, None).await? else {
            return Ok(None);
        };
        let Some(nearest) = listing.nearest_expiration() else {
            return Ok(None);
        };

        if let Some(contracts) = listing.contracts_for(nearest) {
            return contracts.to_chain().map(Some);
        }

        let pinned = self.request_options(symbol, Some(nearest)).await?;
        match pinned.as_ref().and_then(|r| r.contracts_for(nearest)) {
            Some(contracts) => contracts.to_chain().map(Some),
            None => Err(ProviderError::InvalidResponse(format!(
                "no contracts returned for {} expiration {}",
                symbol, nearest
            ))),
        }
    }
}
