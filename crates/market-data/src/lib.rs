//! Networth Market Data Crate
//!
//! Provider clients and call budgeting for latest-price lookups.
//!
//! # Overview
//!
//! - Two live providers: Twelve Data (primary) and Alpha Vantage (fallback)
//! - A deterministic mock provider for development setups without API keys
//! - A [`BudgetTracker`] that enforces per-provider daily and per-minute call allowances
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   Orchestrator   | --> |  BudgetTracker   |  (may we call this provider?)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (TwelveData, AlphaVantage, Mock)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  ProviderPrice   |  (price observed at an instant)
//! +------------------+
//! ```
//!
//! The orchestrator itself lives in `networth-core`; this crate only knows how to talk
//! to providers and how to count calls.

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::MarketDataError;
pub use models::ProviderPrice;

pub use provider::alpha_vantage::{AlphaVantageProvider, PROVIDER_ID as ALPHA_VANTAGE_ID};
pub use provider::mock::MockProvider;
pub use provider::twelve_data::{TwelveDataProvider, PROVIDER_ID as TWELVE_DATA_ID};
pub use provider::{CallBudget, MarketDataProvider};

pub use registry::{BudgetDenial, BudgetTracker, BudgetUsage};
