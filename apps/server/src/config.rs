use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use networth_core::prices::{FreshnessPolicy, MarketHours};
use networth_market_data::CallBudget;

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// API key and call budget of one market data provider.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub budget: CallBudget,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("budget", &self.budget)
            .finish()
    }
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub encryption_key: String,
    pub log_format: LogFormat,
    pub twelve_data: ProviderConfig,
    pub alpha_vantage: ProviderConfig,
    pub market_hours: MarketHours,
    pub max_age_open: chrono::Duration,
    pub max_age_closed: chrono::Duration,
}

impl Config {
    /// Read configuration from the process environment, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let parse_or = |key: &str, default: &str| -> String {
            get(key).unwrap_or_else(|| default.to_string())
        };

        let listen_addr: SocketAddr = parse_or("NW_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid NW_LISTEN_ADDR")?;
        let db_path = parse_or("NW_DB_PATH", "./db/networth.db");
        let cors_allow = parse_or("NW_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = parse_number(&get, "NW_REQUEST_TIMEOUT_MS", 30_000)?;

        let encryption_key =
            get("NW_ENCRYPTION_KEY").ok_or_else(|| anyhow!("NW_ENCRYPTION_KEY is required"))?;

        let log_format = match parse_or("NW_LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => return Err(anyhow!("Invalid NW_LOG_FORMAT '{}'", other)),
        };

        let twelve_data = ProviderConfig {
            api_key: get("TWELVE_DATA_API_KEY"),
            budget: CallBudget::new(
                parse_number(&get, "TWELVE_DATA_DAILY_LIMIT", 800)?,
                parse_number(&get, "TWELVE_DATA_MINUTE_LIMIT", 8)?,
            ),
        };
        let alpha_vantage = ProviderConfig {
            api_key: get("ALPHA_VANTAGE_API_KEY"),
            budget: CallBudget::new(
                parse_number(&get, "ALPHA_VANTAGE_DAILY_LIMIT", 25)?,
                parse_number(&get, "ALPHA_VANTAGE_MINUTE_LIMIT", 5)?,
            ),
        };

        let market_hours = MarketHours::parse(
            &parse_or("NW_MARKET_OPEN", "09:30"),
            &parse_or("NW_MARKET_CLOSE", "16:00"),
            &parse_or("NW_MARKET_TIMEZONE", "America/New_York"),
        )?;
        let max_age_open: i64 = parse_number(&get, "NW_PRICE_MAX_AGE_OPEN_MINUTES", 15)?;
        let max_age_closed: i64 = parse_number(&get, "NW_PRICE_MAX_AGE_CLOSED_MINUTES", 720)?;
        if max_age_open <= 0 || max_age_closed <= 0 {
            return Err(anyhow!("Price max age must be a positive number of minutes"));
        }

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            encryption_key,
            log_format,
            twelve_data,
            alpha_vantage,
            market_hours,
            max_age_open: chrono::Duration::minutes(max_age_open),
            max_age_closed: chrono::Duration::minutes(max_age_closed),
        })
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(self.market_hours, self.max_age_open, self.max_age_closed)
    }
}

fn parse_number<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid {} '{}'", key, raw)),
        None => Ok(default),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("db_path", &self.db_path)
            .field("cors_allow", &self.cors_allow)
            .field("request_timeout", &self.request_timeout)
            .field("log_format", &self.log_format)
            .field("twelve_data", &self.twelve_data)
            .field("alpha_vantage", &self.alpha_vantage)
            .field("market_hours", &self.market_hours)
            .finish_non_exhaustive()
    }
}
