//! Stock quote lookup.
//!
//! Quotes come from a CSV endpoint (stooq by default) whose header row
//! names a `Close` column and whose first data row holds the quote.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::{QuoteConfig, SYMBOL_PLACEHOLDER};
use crate::{ChatError, Result};

/// User agent string for quote requests.
const USER_AGENT: &str = "stockchat-bot/1.0";

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Lookup failures. The display strings are shown to chat users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The endpoint could not be reached.
    #[error("failed to connect to stock API")]
    Connect,

    /// The endpoint answered with a non-success status.
    #[error("API returned status code {0}")]
    Status(u16),

    /// The body has no readable header row.
    #[error("failed to parse CSV header")]
    Header,

    /// The header row has no close column.
    #[error("close price not found in CSV")]
    MissingClose,

    /// The body has a header but no data row.
    #[error("no data found for stock code")]
    NoData,

    /// The data row could not be read.
    #[error("failed to parse CSV data")]
    Malformed,

    /// The close field is not a number.
    #[error("invalid close price")]
    InvalidPrice,

    /// The price is zero or negative.
    #[error("stock not found or invalid code")]
    NotFound,

    /// Any other failure.
    #[error("internal server error")]
    Internal,
}

/// Looks up the current price of a stock symbol.
#[async_trait]
pub trait QuoteLookup: Send + Sync {
    /// Get the close price for a symbol.
    async fn lookup(&self, symbol: &str) -> std::result::Result<f64, LookupError>;
}

/// Quote lookup against a CSV quote endpoint.
pub struct StooqClient {
    client: Client,
    api_url: String,
}

impl StooqClient {
    /// Create a client from configuration.
    pub fn new(config: &QuoteConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// URL for a symbol.
    pub fn url_for(&self, symbol: &str) -> String {
        self.api_url.replace(SYMBOL_PLACEHOLDER, symbol)
    }
}

#[async_trait]
impl QuoteLookup for StooqClient {
    async fn lookup(&self, symbol: &str) -> std::result::Result<f64, LookupError> {
        let url = self.url_for(symbol);
        debug!(symbol = %symbol, url = %url, "Fetching quote");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| LookupError::Connect)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|_| LookupError::Connect)?;
        parse_close_price(&body)
    }
}

/// Extract the close price from a quote CSV body.
///
/// The close column is found by a case-insensitive header match and read
/// from the first data row.
pub fn parse_close_price(body: &str) -> std::result::Result<f64, LookupError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers().map_err(|_| LookupError::Header)?.clone();
    if headers.is_empty() {
        return Err(LookupError::Header);
    }

    let close_index = headers
        .iter()
        .position(|column| column.eq_ignore_ascii_case("close"))
        .ok_or(LookupError::MissingClose)?;

    let record = match reader.records().next() {
        None => return Err(LookupError::NoData),
        Some(Err(_)) => return Err(LookupError::Malformed),
        Some(Ok(record)) => record,
    };

    let field = record.get(close_index).ok_or(LookupError::Malformed)?;
    let price: f64 = field.parse().map_err(|_| LookupError::InvalidPrice)?;

    if !price.is_finite() {
        return Err(LookupError::InvalidPrice);
    }
    if price <= 0.0 {
        return Err(LookupError::NotFound);
    }
    Ok(price)
}
