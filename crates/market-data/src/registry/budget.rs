//! Call budget tracker for market data providers.
//!
//! Each provider gets a daily counter, reset when the local calendar day
//! changes, and a per-minute counter, reset on a fixed 60-second window that
//! starts with the first call after the previous window expired.
//!
//! A call is permitted only when both counters are below their limits. The
//! check and the increment happen under one lock, so counters never exceed the
//! configured limits no matter how many callers race.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use crate::provider::CallBudget;

const MINUTE_WINDOW_SECS: i64 = 60;

/// Why a call was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetDenial {
    #[error("{provider} daily budget of {limit} calls is spent")]
    DailyLimitReached { provider: String, limit: u32 },

    #[error("{provider} per-minute budget of {limit} calls is spent")]
    MinuteLimitReached { provider: String, limit: u32 },
}

/// Point-in-time view of a provider's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    pub provider: String,
    pub daily_limit: u32,
    pub calls_today: u32,
    pub per_minute_limit: u32,
    pub calls_this_minute: u32,
    pub remaining_today: u32,
}

/// Counters for a single provider.
#[derive(Debug)]
struct ProviderBudget {
    budget: CallBudget,
    /// Local calendar day the daily counter belongs to.
    day: NaiveDate,
    calls_today: u32,
    minute_started: DateTime<Utc>,
    calls_this_minute: u32,
}

impl ProviderBudget {
    fn new(budget: CallBudget, now: DateTime<Utc>) -> Self {
        Self {
            budget,
            day: local_day(now),
            calls_today: 0,
            minute_started: now,
            calls_this_minute: 0,
        }
    }

    /// Start new windows if the current ones have expired.
    fn roll_windows(&mut self, now: DateTime<Utc>) {
        let today = local_day(now);
        if today != self.day {
            self.day = today;
            self.calls_today = 0;
        }

        let elapsed = now.signed_duration_since(self.minute_started);
        // A clock that went backwards also starts a fresh window.
        if elapsed >= Duration::seconds(MINUTE_WINDOW_SECS) || elapsed < Duration::zero() {
            self.minute_started = now;
            self.calls_this_minute = 0;
        }
    }

    fn try_acquire(&mut self, provider: &str, now: DateTime<Utc>) -> Result<(), BudgetDenial> {
        self.roll_windows(now);

        if self.calls_today >= self.budget.daily_limit {
            return Err(BudgetDenial::DailyLimitReached {
                provider: provider.to_string(),
                limit: self.budget.daily_limit,
            });
        }

        if self.calls_this_minute >= self.budget.per_minute_limit {
            return Err(BudgetDenial::MinuteLimitReached {
                provider: provider.to_string(),
                limit: self.budget.per_minute_limit,
            });
        }

        self.calls_today += 1;
        self.calls_this_minute += 1;
        Ok(())
    }

    fn usage(&self, provider: &str) -> BudgetUsage {
        BudgetUsage {
            provider: provider.to_string(),
            daily_limit: self.budget.daily_limit,
            calls_today: self.calls_today,
            per_minute_limit: self.budget.per_minute_limit,
            calls_this_minute: self.calls_this_minute,
            remaining_today: self.budget.daily_limit.saturating_sub(self.calls_today),
        }
    }
}

fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Thread-safe budget tracker shared by everything that calls providers.
///
/// Providers are registered with [`configure`](Self::configure). A provider
/// that was never configured gets [`CallBudget::default`] on first use.
#[derive(Debug, Default)]
pub struct BudgetTracker {
    budgets: Mutex<HashMap<String, ProviderBudget>>,
}

impl BudgetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the budgets mutex, recovering from poison if necessary.
    ///
    /// Counters are plain integers, so the data is still consistent after a
    /// panic in another holder.
    fn lock_budgets(&self) -> MutexGuard<'_, HashMap<String, ProviderBudget>> {
        self.budgets.lock().unwrap_or_else(|poisoned| {
            warn!("Budget tracker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the allowance for a provider. Resets its counters.
    pub fn configure(&self, provider: &str, budget: CallBudget) {
        let mut budgets = self.lock_budgets();
        budgets.insert(provider.to_string(), ProviderBudget::new(budget, Utc::now()));
    }

    /// Consume one call from the provider's budget, or refuse.
    pub fn try_acquire(&self, provider: &str) -> Result<(), BudgetDenial> {
        self.try_acquire_at(provider, Utc::now())
    }

    pub(crate) fn try_acquire_at(
        &self,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BudgetDenial> {
        let mut budgets = self.lock_budgets();

        let budget = budgets.entry(provider.to_string()).or_insert_with(|| {
            debug!("Budget tracker: no budget configured for '{}', using default", provider);
            ProviderBudget::new(CallBudget::default(), now)
        });

        let result = budget.try_acquire(provider, now);
        match &result {
            Ok(()) => debug!(
                "Budget tracker: '{}' call {}/{} today, {}/{} this minute",
                provider,
                budget.calls_today,
                budget.budget.daily_limit,
                budget.calls_this_minute,
                budget.budget.per_minute_limit
            ),
            Err(denial) => debug!("Budget tracker: {}", denial),
        }
        result
    }

    /// Current counters for a provider, if it has been configured or used.
    pub fn usage(&self, provider: &str) -> Option<BudgetUsage> {
        self.usage_at(provider, Utc::now())
    }

    pub(crate) fn usage_at(&self, provider: &str, now: DateTime<Utc>) -> Option<BudgetUsage> {
        let mut budgets = self.lock_budgets();
        budgets.get_mut(provider).map(|budget| {
            budget.roll_windows(now);
            budget.usage(provider)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_minute_limit_is_enforced() {
        let tracker = BudgetTracker::new();
        tracker.configure("TWELVE_DATA", CallBudget::new(800, 8));
        let now = noon();

        for _ in 0..8 {
            assert!(tracker.try_acquire_at("TWELVE_DATA", now).is_ok());
        }

        let denial = tracker.try_acquire_at("TWELVE_DATA", now).unwrap_err();
        assert!(matches!(denial, BudgetDenial::MinuteLimitReached { limit: 8, .. }));
    }

    #[test]
    fn test_minute_window_resets_after_sixty_seconds() {
        let tracker = BudgetTracker::new();
        tracker.configure("ALPHA_VANTAGE", CallBudget::new(25, 1));
        let now = noon();

        assert!(tracker.try_acquire_at("ALPHA_VANTAGE", now).is_ok());
        assert!(tracker
            .try_acquire_at("ALPHA_VANTAGE", now + Duration::seconds(59))
            .is_err());
        assert!(tracker
            .try_acquire_at("ALPHA_VANTAGE", now + Duration::seconds(60))
            .is_ok());
    }

    #[test]
    fn test_daily_limit_is_enforced_and_resets_next_day() {
        let tracker = BudgetTracker::new();
        tracker.configure("ALPHA_VANTAGE", CallBudget::new(3, 100));
        let now = noon();

        for _ in 0..3 {
            assert!(tracker.try_acquire_at("ALPHA_VANTAGE", now).is_ok());
        }
        let later = now + Duration::minutes(5);
        let denial = tracker.try_acquire_at("ALPHA_VANTAGE", later).unwrap_err();
        assert!(matches!(denial, BudgetDenial::DailyLimitReached { limit: 3, .. }));

        let tomorrow = now + Duration::days(1);
        assert!(tracker.try_acquire_at("ALPHA_VANTAGE", tomorrow).is_ok());
    }

    #[test]
    fn test_counters_never_exceed_limits() {
        let tracker = BudgetTracker::new();
        tracker.configure("TWELVE_DATA", CallBudget::new(10, 4));
        let start = noon();

        let mut granted = 0;
        for second in 0..600 {
            let now = start + Duration::seconds(second);
            if tracker.try_acquire_at("TWELVE_DATA", now).is_ok() {
                granted += 1;
            }
            let usage = tracker.usage_at("TWELVE_DATA", now).unwrap();
            assert!(usage.calls_today <= 10);
            assert!(usage.calls_this_minute <= 4);
        }
        assert_eq!(granted, 10);
    }

    #[test]
    fn test_denied_calls_are_not_counted() {
        let tracker = BudgetTracker::new();
        tracker.configure("TWELVE_DATA", CallBudget::new(100, 1));
        let now = noon();

        assert!(tracker.try_acquire_at("TWELVE_DATA", now).is_ok());
        assert!(tracker.try_acquire_at("TWELVE_DATA", now).is_err());
        assert!(tracker.try_acquire_at("TWELVE_DATA", now).is_err());

        let usage = tracker.usage_at("TWELVE_DATA", now).unwrap();
        assert_eq!(usage.calls_today, 1);
        assert_eq!(usage.remaining_today, 99);
    }

    #[test]
    fn test_per_provider_isolation() {
        let tracker = BudgetTracker::new();
        tracker.configure("TWELVE_DATA", CallBudget::new(1, 1));
        tracker.configure("ALPHA_VANTAGE", CallBudget::new(1, 1));
        let now = noon();

        assert!(tracker.try_acquire_at("TWELVE_DATA", now).is_ok());
        assert!(tracker.try_acquire_at("TWELVE_DATA", now).is_err());
        assert!(tracker.try_acquire_at("ALPHA_VANTAGE", now).is_ok());
    }

    #[test]
    fn test_unconfigured_provider_gets_default_budget() {
        let tracker = BudgetTracker::new();
        assert!(tracker.usage("NEW_PROVIDER").is_none());

        assert!(tracker.try_acquire("NEW_PROVIDER").is_ok());
        let usage = tracker.usage("NEW_PROVIDER").unwrap();
        assert_eq!(usage.daily_limit, CallBudget::default().daily_limit);
        assert_eq!(usage.calls_today, 1);
    }

    #[test]
    fn test_daily_remaining_rolls_over_with_the_day() {
        let tracker = BudgetTracker::new();
        tracker.configure("ALPHA_VANTAGE", CallBudget::new(25, 5));
        let now = noon();

        for _ in 0..3 {
            assert!(tracker.try_acquire_at("ALPHA_VANTAGE", now).is_ok());
        }
        assert_eq!(
            tracker.usage_at("ALPHA_VANTAGE", now).unwrap().remaining_today,
            22
        );

        let tomorrow = tracker
            .usage_at("ALPHA_VANTAGE", now + Duration::days(1))
            .unwrap();
        assert_eq!(tomorrow.calls_today, 0);
        assert_eq!(tomorrow.remaining_today, 25);
    }
}
