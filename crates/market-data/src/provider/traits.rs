//! Market data provider trait definitions.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::ProviderPrice;

use super::capabilities::CallBudget;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new price source. The
/// orchestrator uses [`id`](Self::id) for budget accounting and logging, and
/// tags cached prices with [`source_name`](Self::source_name).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use networth_market_data::provider::{CallBudget, MarketDataProvider};
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn source_name(&self) -> &'static str {
///         "myprovider"
///     }
///
///     fn default_budget(&self) -> CallBudget {
///         CallBudget::new(100, 5)
///     }
///
///     // ... implement get_latest_price
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider, like "TWELVE_DATA".
    fn id(&self) -> &'static str;

    /// Source tag persisted with prices from this provider, like "twelvedata".
    fn source_name(&self) -> &'static str;

    /// Call allowance of the provider's plan.
    ///
    /// Configuration may override it when the provider is registered.
    fn default_budget(&self) -> CallBudget;

    /// Fetch the latest price for a symbol.
    ///
    /// Network failures, unexpected payloads and provider-side rate limits are
    /// all reported as `MarketDataError`; callers never see a partial price.
    async fn get_latest_price(&self, symbol: &str) -> Result<ProviderPrice, MarketDataError>;
}
