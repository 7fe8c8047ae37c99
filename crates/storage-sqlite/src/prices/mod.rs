mod model;
mod repository;

pub use model::{NewStockPriceDB, StockPriceDB};
pub use repository::PriceCacheRepository;
