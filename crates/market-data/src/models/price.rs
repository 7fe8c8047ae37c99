use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price observation returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPrice {
    /// Symbol as requested.
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// Instant the price was observed.
    pub observed_at: DateTime<Utc>,
    /// Source tag stored alongside cached prices (e.g. "twelvedata").
    pub source: String,
}

impl ProviderPrice {
    pub fn new(symbol: impl Into<String>, price: Decimal, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            observed_at: Utc::now(),
            source: source.into(),
        }
    }
}
