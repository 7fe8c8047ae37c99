//! Shared bookkeeping for provider calls.
//!
//! - `BudgetTracker` - per-provider daily and per-minute call allowances

mod budget;

pub use budget::{BudgetDenial, BudgetTracker, BudgetUsage};
