//! Deterministic price source for development setups with no API keys.
//!
//! The same symbol always yields the same price, so a development database
//! does not fill up with random values. Never registered alongside live providers.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::ProviderPrice;
use crate::provider::{CallBudget, MarketDataProvider};

const PROVIDER_ID: &str = "MOCK";
const SOURCE_NAME: &str = "mock";

#[derive(Debug, Default, Clone, Copy)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    /// Price in [10.00, 500.00) derived from an MD5 digest of the symbol.
    fn price_for(symbol: &str) -> Decimal {
        let digest = md5::compute(symbol.as_bytes()).0;
        let seed = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let cents = 1_000 + i64::from(seed % 49_000);
        Decimal::new(cents, 2)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn default_budget(&self) -> CallBudget {
        CallBudget::unlimited()
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<ProviderPrice, MarketDataError> {
        if symbol.trim().is_empty() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }
        Ok(ProviderPrice::new(
            symbol,
            Self::price_for(symbol),
            SOURCE_NAME,
        ))
    }
}
