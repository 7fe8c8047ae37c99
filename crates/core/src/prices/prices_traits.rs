use async_trait::async_trait;

use super::prices_model::{BatchRefreshResult, FreshnessReport, NewStockPrice, PriceResult, StockPrice};
use crate::errors::Result;

/// Trait for price cache repository operations
#[async_trait]
pub trait PriceCacheRepositoryTrait: Send + Sync {
    /// Most recent cached price for a symbol.
    fn latest(&self, symbol: &str) -> Result<Option<StockPrice>>;

    /// Most recent cached price of every symbol, ordered by symbol.
    fn latest_for_all(&self) -> Result<Vec<StockPrice>>;

    /// Newest first, at most `limit` rows.
    fn history(&self, symbol: &str, limit: i64) -> Result<Vec<StockPrice>>;

    /// Append a price. A row with the same symbol and timestamp is kept as is.
    async fn insert(&self, price: NewStockPrice) -> Result<StockPrice>;
}

/// Trait for price refresh operations
#[async_trait]
pub trait PriceRefreshServiceTrait: Send + Sync {
    async fn refresh_symbol(&self, symbol: &str, force: bool) -> Result<PriceResult>;
    async fn refresh_symbols(&self, symbols: &[String], force: bool) -> BatchRefreshResult;
    fn get_status(&self) -> Result<FreshnessReport>;
    fn get_cached_price(&self, symbol: &str) -> Result<Option<StockPrice>>;
    fn price_history(&self, symbol: &str, limit: usize) -> Result<Vec<StockPrice>>;
}
