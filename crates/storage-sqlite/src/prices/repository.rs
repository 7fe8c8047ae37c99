use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use networth_core::errors::{Error, Result};
use networth_core::prices::{NewStockPrice, PriceCacheRepositoryTrait, StockPrice};

use super::model::{NewStockPriceDB, StockPriceDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::stock_prices;

const LATEST_FOR_ALL_SQL: &str = "
    SELECT p.id, p.symbol, p.price, p.timestamp, p.source
    FROM stock_prices p
    JOIN (
        SELECT symbol, MAX(timestamp) AS latest
        FROM stock_prices
        GROUP BY symbol
    ) l ON p.symbol = l.symbol AND p.timestamp = l.latest
    ORDER BY p.symbol ASC
";

pub struct PriceCacheRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl PriceCacheRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        PriceCacheRepository { pool, writer }
    }
}

fn to_domain(rows: Vec<StockPriceDB>) -> Result<Vec<StockPrice>> {
    rows.into_iter()
        .map(|row| StockPrice::try_from(row).map_err(Error::from))
        .collect()
}

#[async_trait]
impl PriceCacheRepositoryTrait for PriceCacheRepository {
    fn latest(&self, symbol: &str) -> Result<Option<StockPrice>> {
        let mut conn = get_connection(&self.pool)?;
        let row = stock_prices::table
            .filter(stock_prices::symbol.eq(symbol))
            .order(stock_prices::timestamp.desc())
            .select(StockPriceDB::as_select())
            .first::<StockPriceDB>(&mut conn)
            .optional()
            .into_core()?;

        row.map(|r| StockPrice::try_from(r).map_err(Error::from))
            .transpose()
    }

    fn latest_for_all(&self) -> Result<Vec<StockPrice>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = diesel::sql_query(LATEST_FOR_ALL_SQL)
            .load::<StockPriceDB>(&mut conn)
            .into_core()?;
        to_domain(rows)
    }

    fn history(&self, symbol: &str, limit: i64) -> Result<Vec<StockPrice>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = stock_prices::table
            .filter(stock_prices::symbol.eq(symbol))
            .order(stock_prices::timestamp.desc())
            .limit(limit)
            .select(StockPriceDB::as_select())
            .load::<StockPriceDB>(&mut conn)
            .into_core()?;
        to_domain(rows)
    }

    async fn insert(&self, price: NewStockPrice) -> Result<StockPrice> {
        let row = NewStockPriceDB::from(price);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<StockPrice> {
                let inserted = diesel::insert_into(stock_prices::table)
                    .values(&row)
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .into_core()?;
                if inserted == 0 {
                    debug!(
                        "Price for {} at {} already cached, keeping it",
                        row.symbol, row.timestamp
                    );
                }

                let stored = stock_prices::table
                    .filter(stock_prices::symbol.eq(&row.symbol))
                    .filter(stock_prices::timestamp.eq(&row.timestamp))
                    .select(StockPriceDB::as_select())
                    .first::<StockPriceDB>(conn)
                    .into_core()?;

                Ok(StockPrice::try_from(stored)?)
            })
            .await
    }
}
