//! Provider call budgets.
//!
//! Providers on free tiers allow a fixed number of calls per day and per minute.
//! A [`CallBudget`] describes those allowances; the
//! [`BudgetTracker`](crate::registry::BudgetTracker) enforces them.

use serde::{Deserialize, Serialize};

/// Daily and per-minute call allowance for a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBudget {
    /// Maximum calls allowed per calendar day.
    pub daily_limit: u32,

    /// Maximum calls allowed per 60-second window.
    pub per_minute_limit: u32,
}

impl CallBudget {
    pub const fn new(daily_limit: u32, per_minute_limit: u32) -> Self {
        Self {
            daily_limit,
            per_minute_limit,
        }
    }

    /// A budget that never runs out. Used for the mock provider.
    pub const fn unlimited() -> Self {
        Self {
            daily_limit: u32::MAX,
            per_minute_limit: u32::MAX,
        }
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::new(500, 5)
    }
}
