//! Price refresh orchestrator.
//!
//! Decides, per symbol, whether to serve the cache or call a provider:
//!
//! 1. unforced and the newest cached price is fresh: serve it, no calls
//! 2. the primary provider, if its call budget allows
//! 3. the fallback provider, under the same rule
//! 4. the newest cached price even if stale, flagged as such
//! 5. otherwise `RateLimited` when every attempt was rate limited, else `NoDataAvailable`
//!
//! The mock provider is a separate [`PriceSources::Development`] setup used only
//! when no provider key exists; live providers that are rate limited never
//! fall through to it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use networth_market_data::{
    AlphaVantageProvider, BudgetTracker, MarketDataProvider, MockProvider, ProviderPrice,
    TwelveDataProvider,
};
use std::sync::Arc;

use super::market_hours::FreshnessPolicy;
use super::prices_errors::PriceError;
use super::prices_model::{
    normalize_symbol, BatchRefreshResult, FreshnessReport, NewStockPrice, PriceResult,
    RefreshFailure, RefreshPath, StockPrice, SymbolFreshness,
};
use super::prices_traits::{PriceCacheRepositoryTrait, PriceRefreshServiceTrait};
use crate::errors::Result;

/// Upper bound on rows returned by a history query.
pub const MAX_HISTORY_LIMIT: usize = 1_000;

/// Where live prices come from.
#[derive(Clone)]
pub enum PriceSources {
    /// Real providers, tried in order.
    Live {
        primary: Arc<dyn MarketDataProvider>,
        fallback: Option<Arc<dyn MarketDataProvider>>,
    },
    /// No provider key configured: deterministic mock prices.
    Development { mock: Arc<dyn MarketDataProvider> },
}

impl PriceSources {
    /// Pick sources from the configured API keys.
    ///
    /// Twelve Data is primary and Alpha Vantage the fallback. A single key
    /// gives a single live provider. No key at all selects the mock.
    pub fn from_api_keys(twelve_data_key: Option<String>, alpha_vantage_key: Option<String>) -> Self {
        let twelve_data = twelve_data_key
            .filter(|k| !k.trim().is_empty())
            .map(|k| Arc::new(TwelveDataProvider::new(k)) as Arc<dyn MarketDataProvider>);
        let alpha_vantage = alpha_vantage_key
            .filter(|k| !k.trim().is_empty())
            .map(|k| Arc::new(AlphaVantageProvider::new(k)) as Arc<dyn MarketDataProvider>);

        match (twelve_data, alpha_vantage) {
            (Some(primary), fallback) => PriceSources::Live { primary, fallback },
            (None, Some(primary)) => PriceSources::Live {
                primary,
                fallback: None,
            },
            (None, None) => {
                warn!("No market data API key configured, serving mock prices");
                PriceSources::Development {
                    mock: Arc::new(MockProvider::new()),
                }
            }
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, PriceSources::Development { .. })
    }

    fn attempts(&self) -> Vec<(Arc<dyn MarketDataProvider>, RefreshPath)> {
        match self {
            PriceSources::Live { primary, fallback } => {
                let mut attempts = vec![(primary.clone(), RefreshPath::Primary)];
                if let Some(fallback) = fallback {
                    attempts.push((fallback.clone(), RefreshPath::Fallback));
                }
                attempts
            }
            PriceSources::Development { mock } => vec![(mock.clone(), RefreshPath::Mock)],
        }
    }

    pub fn providers(&self) -> Vec<Arc<dyn MarketDataProvider>> {
        self.attempts().into_iter().map(|(p, _)| p).collect()
    }
}

pub struct PriceRefreshService {
    repository: Arc<dyn PriceCacheRepositoryTrait>,
    sources: PriceSources,
    budgets: Arc<BudgetTracker>,
    freshness: FreshnessPolicy,
}

impl PriceRefreshService {
    /// Providers without a configured budget get their plan's default.
    pub fn new(
        repository: Arc<dyn PriceCacheRepositoryTrait>,
        sources: PriceSources,
        budgets: Arc<BudgetTracker>,
        freshness: FreshnessPolicy,
    ) -> Self {
        for provider in sources.providers() {
            if budgets.usage(provider.id()).is_none() {
                budgets.configure(provider.id(), provider.default_budget());
            }
        }

        Self {
            repository,
            sources,
            budgets,
            freshness,
        }
    }

    /// One provider attempt: budget first, then the call.
    async fn attempt(
        &self,
        provider: &Arc<dyn MarketDataProvider>,
        symbol: &str,
    ) -> std::result::Result<ProviderPrice, PriceError> {
        if let Err(denial) = self.budgets.try_acquire(provider.id()) {
            warn!("Skipping {} for {}: {}", provider.id(), symbol, denial);
            return Err(PriceError::RateLimited {
                symbol: symbol.to_string(),
                detail: denial.to_string(),
            });
        }

        match provider.get_latest_price(symbol).await {
            Ok(fetched) => Ok(fetched),
            Err(e) if e.is_rate_limited() => {
                warn!("{} rate limited the request for {}", provider.id(), symbol);
                Err(PriceError::RateLimited {
                    symbol: symbol.to_string(),
                    detail: e.to_string(),
                })
            }
            Err(e) => {
                warn!("{} unavailable for {}: {}", provider.id(), symbol, e);
                Err(PriceError::ProviderUnavailable {
                    provider: provider.id().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Refresh `symbol` with freshness judged at `now`.
    pub(crate) async fn refresh_symbol_at(
        &self,
        symbol: &str,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<PriceResult> {
        let symbol = normalize_symbol(symbol)?;
        let cached = self.repository.latest(&symbol)?;

        if !force {
            if let Some(cached) = &cached {
                if self.freshness.is_fresh(cached.timestamp, now) {
                    debug!("{}: path=cache source={}", symbol, cached.source);
                    return Ok(PriceResult::from_cached(
                        cached.clone(),
                        RefreshPath::Cache,
                        false,
                    ));
                }
            }
        }

        let mut failures = Vec::new();
        for (provider, path) in self.sources.attempts() {
            match self.attempt(&provider, &symbol).await {
                Ok(fetched) => {
                    let stored = self
                        .repository
                        .insert(NewStockPrice {
                            symbol: symbol.clone(),
                            price: fetched.price,
                            timestamp: fetched.observed_at,
                            source: provider.source_name().to_string(),
                        })
                        .await?;
                    info!(
                        "{}: path={} price={} source={} force={}",
                        symbol,
                        path.as_str(),
                        stored.price,
                        stored.source,
                        force
                    );
                    return Ok(PriceResult::from_cached(stored, path, false));
                }
                Err(e) => failures.push(e),
            }
        }

        if let Some(cached) = cached {
            let is_stale = !self.freshness.is_fresh(cached.timestamp, now);
            warn!(
                "{}: path=stale_cache source={} observed_at={} ({} provider failures)",
                symbol,
                cached.source,
                cached.timestamp,
                failures.len()
            );
            return Ok(PriceResult::from_cached(
                cached,
                RefreshPath::StaleCache,
                is_stale,
            ));
        }

        let error = Self::refresh_failure(&symbol, &failures);
        warn!("{}: path=none error={}", symbol, error);
        Err(error.into())
    }

    fn refresh_failure(symbol: &str, failures: &[PriceError]) -> PriceError {
        if !failures.is_empty() && failures.iter().all(PriceError::is_rate_limited) {
            let detail = failures
                .iter()
                .filter_map(|f| match f {
                    PriceError::RateLimited { detail, .. } => Some(detail.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("; ");
            PriceError::RateLimited {
                symbol: symbol.to_string(),
                detail,
            }
        } else {
            PriceError::NoDataAvailable {
                symbol: symbol.to_string(),
            }
        }
    }
}

#[async_trait]
impl PriceRefreshServiceTrait for PriceRefreshService {
    async fn refresh_symbol(&self, symbol: &str, force: bool) -> Result<PriceResult> {
        self.refresh_symbol_at(symbol, force, Utc::now()).await
    }

    async fn refresh_symbols(&self, symbols: &[String], force: bool) -> BatchRefreshResult {
        let mut result = BatchRefreshResult::default();
        for symbol in symbols {
            match self.refresh_symbol(symbol, force).await {
                Ok(price) => result.refreshed.push(price),
                Err(e) => result.failed.push(RefreshFailure {
                    symbol: symbol.trim().to_uppercase(),
                    error: e.to_string(),
                }),
            }
        }
        debug!(
            "Batch refresh: {} refreshed, {} failed",
            result.refreshed.len(),
            result.failed.len()
        );
        result
    }

    fn get_status(&self) -> Result<FreshnessReport> {
        let now = Utc::now();
        let symbols = self
            .repository
            .latest_for_all()?
            .into_iter()
            .map(|price| SymbolFreshness {
                age_seconds: now.signed_duration_since(price.timestamp).num_seconds().max(0),
                is_fresh: self.freshness.is_fresh(price.timestamp, now),
                symbol: price.symbol,
                price: price.price,
                timestamp: price.timestamp,
                source: price.source,
            })
            .collect();

        let providers = self
            .sources
            .providers()
            .iter()
            .filter_map(|p| self.budgets.usage(p.id()))
            .collect();

        Ok(FreshnessReport {
            checked_at: now,
            market_open: self.freshness.market_hours().is_open_at(now),
            max_age_minutes: self.freshness.max_age_at(now).num_minutes(),
            mode: if self.sources.is_development() {
                "development".to_string()
            } else {
                "live".to_string()
            },
            symbols,
            providers,
        })
    }

    fn get_cached_price(&self, symbol: &str) -> Result<Option<StockPrice>> {
        let symbol = normalize_symbol(symbol)?;
        self.repository.latest(&symbol)
    }

    fn price_history(&self, symbol: &str, limit: usize) -> Result<Vec<StockPrice>> {
        let symbol = normalize_symbol(symbol)?;
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT) as i64;
        self.repository.history(&symbol, limit)
    }
}
