//! Market data models.

mod price;

pub use price::ProviderPrice;
