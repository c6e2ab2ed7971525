//! SQLite implementation of [`CatalogRepo`].
//!
//! Reference lookups are chunked so a batch never binds more parameters than
//! SQLite accepts in one statement.

use std::collections::HashMap;

use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::{SqliteConnection, insert_into};

use super::{CatalogRepo, ExistingStock, ProductRef, RepoResult};
use crate::{
    models::{NewOffer, NewStock, Product, StockUpdate},
    price::Price,
    schema::{booking, offer, product, stock},
    timestamp,
};

/// Catalog repository over a SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteCatalog {
    chunk_size: usize,
}

impl SqliteCatalog {
    /// Creates a repository querying at most `chunk_size` references per statement.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for SqliteCatalog {
    fn default() -> Self {
        Self::new(500)
    }
}

impl CatalogRepo for SqliteCatalog {
    fn products_by_references(
        &self,
        conn: &mut SqliteConnection,
        references: &[String],
    ) -> RepoResult<HashMap<String, ProductRef>> {
        let mut out = HashMap::with_capacity(references.len());
        for chunk in references.chunks(self.chunk_size) {
            let rows: Vec<Product> = product::table
                .filter(product::id_at_providers.eq_any(chunk.iter().map(String::as_str)))
                .filter(product::gcu_compatible.eq(true))
                .select(Product::as_select())
                .load(conn)?;
            for row in rows {
                if let Some(reference) = row.id_at_providers.clone() {
                    out.insert(reference, ProductRef::from(row));
                }
            }
        }
        Ok(out)
    }

    fn offer_ids_by_references(
        &self,
        conn: &mut SqliteConnection,
        references: &[String],
    ) -> RepoResult<HashMap<String, i32>> {
        let mut out = HashMap::with_capacity(references.len());
        for chunk in references.chunks(self.chunk_size) {
            let rows: Vec<(Option<String>, i32)> = offer::table
                .filter(offer::id_at_providers.eq_any(chunk.iter().map(String::as_str)))
                .select((offer::id_at_providers, offer::id))
                .load(conn)?;
            out.extend(rows.into_iter().filter_map(|(r, id)| r.map(|r| (r, id))));
        }
        Ok(out)
    }

    fn stocks_by_references(
        &self,
        conn: &mut SqliteConnection,
        references: &[String],
    ) -> RepoResult<HashMap<String, ExistingStock>> {
        let mut out = HashMap::with_capacity(references.len());
        for chunk in references.chunks(self.chunk_size) {
            let rows: Vec<(i32, i32, Option<i32>, i64, Option<String>)> = stock::table
                .filter(stock::id_at_providers.eq_any(chunk.iter().map(String::as_str)))
                .select((
                    stock::id,
                    stock::offer_id,
                    stock::quantity,
                    stock::price_cents,
                    stock::id_at_providers,
                ))
                .load(conn)?;
            if rows.is_empty() {
                continue;
            }

            let ids: Vec<i32> = rows.iter().map(|r| r.0).collect();
            let booked: HashMap<i32, i64> = booking::table
                .filter(booking::stock_id.eq_any(&ids))
                .filter(booking::is_cancelled.eq(false))
                .group_by(booking::stock_id)
                .select((booking::stock_id, sum(booking::quantity)))
                .load::<(i32, Option<i64>)>(conn)?
                .into_iter()
                .map(|(id, total)| (id, total.unwrap_or(0)))
                .collect();

            for (id, offer_id, quantity, price_cents, reference) in rows {
                let Some(reference) = reference else { continue };
                out.insert(
                    reference,
                    ExistingStock {
                        id,
                        offer_id,
                        quantity,
                        price: Price::from_cents(price_cents)?,
                        booking_quantity: booked.get(&id).copied().unwrap_or(0),
                    },
                );
            }
        }
        Ok(out)
    }

    fn retag_offers(
        &self,
        conn: &mut SqliteConnection,
        offer_ids: &[i32],
        provider_id: Option<i32>,
    ) -> RepoResult<usize> {
        let now = timestamp::now();
        let mut n = 0;
        for chunk in offer_ids.chunks(self.chunk_size) {
            n += diesel::update(offer::table.filter(offer::id.eq_any(chunk)))
                .set((
                    offer::last_provider_id.eq(provider_id),
                    offer::date_modified.eq(&now),
                ))
                .execute(conn)?;
        }
        Ok(n)
    }

    fn insert_offers(&self, conn: &mut SqliteConnection, offers: &[NewOffer]) -> RepoResult<usize> {
        let mut n = 0;
        for chunk in offers.chunks(self.chunk_size) {
            n += insert_into(offer::table).values(chunk).execute(conn)?;
        }
        Ok(n)
    }

    fn insert_stocks(&self, conn: &mut SqliteConnection, stocks: &[NewStock]) -> RepoResult<usize> {
        let mut n = 0;
        for chunk in stocks.chunks(self.chunk_size) {
            n += insert_into(stock::table).values(chunk).execute(conn)?;
        }
        Ok(n)
    }

    fn update_stocks(
        &self,
        conn: &mut SqliteConnection,
        updates: &[(i32, StockUpdate)],
    ) -> RepoResult<usize> {
        let mut n = 0;
        for (id, changes) in updates {
            n += diesel::update(stock::table.find(*id))
                .set(changes)
                .execute(conn)?;
        }
        Ok(n)
    }
}
