//! Networth Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic of the net worth tracker:
//! - the encrypted credential store for linked services
//! - the price refresh engine (cache freshness, provider budgets, fallback)
//!
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod credentials;
pub mod crypto;
pub mod errors;
pub mod prices;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
