use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Network or payload failure talking to a provider.
    #[error("Provider {provider} is unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// Every attempt was refused by a call budget or a provider-side rate limit.
    #[error("Rate limited while refreshing {symbol}: {detail}")]
    RateLimited { symbol: String, detail: String },

    /// No provider produced a price and nothing is cached.
    #[error("No price data available for {symbol}")]
    NoDataAvailable { symbol: String },
}

impl PriceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PriceError::RateLimited { .. })
    }
}
