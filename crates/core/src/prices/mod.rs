//! Prices module - price cache, freshness policy and refresh orchestration.

mod market_hours;
mod price_refresh_service;
mod prices_errors;
mod prices_model;
mod prices_traits;


pub use market_hours::{FreshnessPolicy, MarketHours, DEFAULT_MARKET_TZ};
pub use price_refresh_service::{PriceRefreshService, PriceSources, MAX_HISTORY_LIMIT};
pub use prices_errors::PriceError;
pub use prices_model::{
    normalize_symbol, BatchRefreshResult, FreshnessReport, NewStockPrice, PriceResult,
    RefreshFailure, RefreshPath, StockPrice, SymbolFreshness,
};
pub use prices_traits::{PriceCacheRepositoryTrait, PriceRefreshServiceTrait};
