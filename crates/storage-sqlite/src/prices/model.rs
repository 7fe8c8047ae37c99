//! Database models for the price cache.

use diesel::prelude::*;

use networth_core::prices::{NewStockPrice, StockPrice};

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_decimal, parse_timestamp};

#[derive(Queryable, QueryableByName, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stock_prices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockPriceDB {
    pub id: i64,
    pub symbol: String,
    pub price: String,
    pub timestamp: String,
    pub source: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::stock_prices)]
pub struct NewStockPriceDB {
    pub symbol: String,
    pub price: String,
    pub timestamp: String,
    pub source: String,
}

impl From<NewStockPrice> for NewStockPriceDB {
    fn from(price: NewStockPrice) -> Self {
        Self {
            symbol: price.symbol,
            price: price.price.to_string(),
            timestamp: format_timestamp(price.timestamp),
            source: price.source,
        }
    }
}

impl TryFrom<StockPriceDB> for StockPrice {
    type Error = StorageError;

    fn try_from(db: StockPriceDB) -> Result<Self, Self::Error> {
        Ok(StockPrice {
            id: db.id,
            price: parse_decimal(&db.price)?,
            timestamp: parse_timestamp(&db.timestamp)?,
            symbol: db.symbol,
            source: db.source,
        })
    }
}
