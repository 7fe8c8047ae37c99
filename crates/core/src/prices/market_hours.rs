//! Market hours and cache freshness policy.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::errors::{Error, Result};

/// Default exchange timezone for US equities.
pub const DEFAULT_MARKET_TZ: Tz = chrono_tz::America::New_York;

/// Regular trading session, Monday to Friday, in the exchange's local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketHours {
    open: NaiveTime,
    close: NaiveTime,
    timezone: Tz,
}

impl MarketHours {
    pub fn new(open: NaiveTime, close: NaiveTime, timezone: Tz) -> Result<Self> {
        if open >= close {
            return Err(Error::InvalidConfigValue(format!(
                "market open {} must be before close {}",
                open, close
            )));
        }
        Ok(Self {
            open,
            close,
            timezone,
        })
    }

    /// Parse "HH:MM" times and an IANA timezone name.
    pub fn parse(open: &str, close: &str, timezone: &str) -> Result<Self> {
        let parse_time = |value: &str| {
            NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
                Error::InvalidConfigValue(format!("invalid market time '{}': {}", value, e))
            })
        };
        let timezone: Tz = timezone.trim().parse().map_err(|e| {
            Error::InvalidConfigValue(format!("invalid market timezone '{}': {}", timezone, e))
        })?;
        Self::new(parse_time(open)?, parse_time(close)?, timezone)
    }

    /// Open iff the local time is in `[open, close)` on a weekday.
    pub fn is_open_at(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.timezone);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = local.time();
        time >= self.open && time < self.close
    }
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            timezone: DEFAULT_MARKET_TZ,
        }
    }
}

/// How old a cached price may be before a provider is asked again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreshnessPolicy {
    market_hours: MarketHours,
    max_age_open: Duration,
    max_age_closed: Duration,
}

impl FreshnessPolicy {
    pub fn new(market_hours: MarketHours, max_age_open: Duration, max_age_closed: Duration) -> Self {
        Self {
            market_hours,
            max_age_open,
            max_age_closed,
        }
    }

    pub fn market_hours(&self) -> &MarketHours {
        &self.market_hours
    }

    pub fn max_age_at(&self, now: DateTime<Utc>) -> Duration {
        if self.market_hours.is_open_at(now) {
            self.max_age_open
        } else {
            self.max_age_closed
        }
    }

    /// A price is fresh while it is younger than the threshold in force at `now`.
    pub fn is_fresh(&self, observed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(observed_at) < self.max_age_at(now)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(
            MarketHours::default(),
            Duration::minutes(15),
            Duration::minutes(720),
        )
    }
}
