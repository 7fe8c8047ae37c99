//! Alpha Vantage market data provider implementation.
//!
//! Latest prices come from the GLOBAL_QUOTE endpoint.
//!
//! Note: the Alpha Vantage free tier is limited to 25 calls per day and
//! 5 calls per minute. Exceeding it does not produce an HTTP error; the API
//! answers 200 with a "Note" or "Information" message instead.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::ProviderPrice;
use crate::provider::{CallBudget, MarketDataProvider};

const BASE_URL: &str = "https://www.alphavantage.co";
pub const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const SOURCE_NAME: &str = "alphavantage";

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Only the fields we read; the API returns open/high/low/volume/change as well.
#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a provider that talks to a different host (used by tests).
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let endpoint = format!("{}/query", self.base_url);
        let url = reqwest::Url::parse_with_params(&endpoint, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }

    /// Check for API-level errors in the response.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(ref msg) = error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        for msg in [note, information].into_iter().flatten() {
            if Self::is_rate_limit_message(msg) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage notice: {}", msg);
        }

        Ok(())
    }

    fn is_rate_limit_message(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        lower.contains("api call frequency")
            || lower.contains("rate limit")
            || lower.contains("requests per day")
    }

    /// Turn a GLOBAL_QUOTE body into a price observation.
    fn parse_global_quote(symbol: &str, body: &str) -> Result<ProviderPrice, MarketDataError> {
        let response: GlobalQuoteResponse =
            serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let quote = match response.global_quote {
            Some(quote) => quote,
            None => {
                return Err(match response.information {
                    Some(info) => MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: info,
                    },
                    None => MarketDataError::SymbolNotFound(symbol.to_string()),
                })
            }
        };

        // An unknown symbol comes back as an empty "Global Quote" object.
        let raw_price = quote
            .price
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = Decimal::from_str(raw_price.trim()).map_err(|e| {
            MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Invalid price '{}': {}", raw_price, e),
            }
        })?;

        if price <= Decimal::ZERO {
            return Err(MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Non-positive price {} for {}", price, symbol),
            });
        }

        let quoted_symbol = quote.symbol.unwrap_or_else(|| symbol.to_string());
        Ok(ProviderPrice::new(quoted_symbol, price, SOURCE_NAME))
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn default_budget(&self) -> CallBudget {
        CallBudget::new(25, 5)
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<ProviderPrice, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;
        let price = Self::parse_global_quote(symbol, &text)?;

        debug!("Alpha Vantage: {} = {}", price.symbol, price.price);
        Ok(price)
    }
}
