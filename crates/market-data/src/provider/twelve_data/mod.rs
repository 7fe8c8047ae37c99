//! Twelve Data market data provider implementation.
//!
//! Latest prices come from the `/price` endpoint, which costs one API credit
//! per symbol. Errors are reported in the body as
//! `{"status": "error", "code": 429, "message": "..."}`, usually with HTTP 200.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::ProviderPrice;
use crate::provider::{CallBudget, MarketDataProvider};

const BASE_URL: &str = "https://api.twelvedata.com";
pub const PROVIDER_ID: &str = "TWELVE_DATA";
const SOURCE_NAME: &str = "twelvedata";

/// Twelve Data market data provider.
///
/// Basic plan: 800 credits per day, 8 per minute.
pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

/// `/price` response. On error `price` is absent and `status` is "error".
#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Option<String>,
    status: Option<String>,
    code: Option<u16>,
    message: Option<String>,
}

impl TwelveDataProvider {
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

    async fn fetch_price_body(&self, symbol: &str) -> Result<String, MarketDataError> {
        let endpoint = format!("{}/price", self.base_url);
        let url = reqwest::Url::parse_with_params(
            &endpoint,
            &[("symbol", symbol), ("apikey", self.api_key.as_str())],
        )
        .map_err(|e| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to build URL: {}", e),
        })?;

        debug!(
            "Twelve Data request: {}",
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

    fn parse_price(symbol: &str, body: &str) -> Result<ProviderPrice, MarketDataError> {
        let response: PriceResponse =
            serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        if response.status.as_deref() == Some("error") {
            let message = response.message.unwrap_or_default();
            return Err(match response.code {
                Some(429) => MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                },
                Some(400) | Some(404) => MarketDataError::SymbolNotFound(format!(
                    "{}: {}",
                    symbol, message
                )),
                _ => MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message,
                },
            });
        }

        let raw_price = response
            .price
            .ok_or_else(|| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: "Response has no price".to_string(),
            })?;

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

        Ok(ProviderPrice::new(symbol, price, SOURCE_NAME))
    }
}

#[async_trait]
impl MarketDataProvider for TwelveDataProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn default_budget(&self) -> CallBudget {
        CallBudget::new(800, 8)
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<ProviderPrice, MarketDataError> {
        let body = self.fetch_price_body(symbol).await?;
        let price = Self::parse_price(symbol, &body)?;

        debug!("Twelve Data: {} = {}", price.symbol, price.price);
        Ok(price)
    }
}
