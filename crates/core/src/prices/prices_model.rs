//! Price cache domain models.

use chrono::{DateTime, Utc};
use networth_market_data::BudgetUsage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// One observed price of a symbol, as cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPrice {
    pub id: i64,
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Input model for appending to the price cache.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStockPrice {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Which branch of the refresh policy produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPath {
    Cache,
    Primary,
    Fallback,
    StaleCache,
    Mock,
}

impl RefreshPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPath::Cache => "cache",
            RefreshPath::Primary => "primary",
            RefreshPath::Fallback => "fallback",
            RefreshPath::StaleCache => "stale_cache",
            RefreshPath::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub path: RefreshPath,
    pub is_stale: bool,
}

impl PriceResult {
    pub fn from_cached(cached: StockPrice, path: RefreshPath, is_stale: bool) -> Self {
        Self {
            symbol: cached.symbol,
            price: cached.price,
            timestamp: cached.timestamp,
            source: cached.source,
            path,
            is_stale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRefreshResult {
    pub refreshed: Vec<PriceResult>,
    pub failed: Vec<RefreshFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFreshness {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub age_seconds: i64,
    pub is_fresh: bool,
}

/// Snapshot of cache freshness and provider budgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessReport {
    pub checked_at: DateTime<Utc>,
    pub market_open: bool,
    pub max_age_minutes: i64,
    /// "live" when real providers are configured, "development" for the mock.
    pub mode: String,
    pub symbols: Vec<SymbolFreshness>,
    pub providers: Vec<BudgetUsage>,
}

/// Trim and upper-case a ticker symbol.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ValidationError::MissingField("symbol".to_string()).into());
    }
    Ok(symbol)
}
