//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - The default call budget each provider advertises
//! - Concrete provider implementations (Twelve Data, Alpha Vantage, mock)

mod capabilities;
mod traits;

pub mod alpha_vantage;
pub mod mock;
pub mod twelve_data;

pub use capabilities::CallBudget;
pub use traits::MarketDataProvider;
