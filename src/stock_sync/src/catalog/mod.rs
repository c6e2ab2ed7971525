//! Catalog storage: the bulk reads and writes the synchronization needs.
//!
//! [`CatalogRepo`] is the portable surface; the SQLite implementation lives in
//! [`repo`]. Every method takes the caller's connection so the whole batch can
//! run inside one transaction owned by the orchestrator.

pub mod repo;

use std::collections::HashMap;

use diesel::SqliteConnection;
use serde_json::Value;
use tracing::debug;

use crate::{
    models::{NewOffer, NewStock, Product, StockUpdate},
    price::Price,
};

pub use repo::SqliteCatalog;

/// Result type used throughout the catalog repository.
pub type RepoResult<T> = anyhow::Result<T>;

/// Key of the catalog price inside a product's `extra_data`.
pub const LIST_PRICE_KEY: &str = "prix_livre";

/// Older metadata key, read when [`LIST_PRICE_KEY`] is absent.
pub const LEGACY_LIST_PRICE_KEY: &str = "list_price";

/// The product fields a new offer is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    /// Product id.
    pub id: i32,
    /// Title.
    pub name: String,
    /// Long description.
    pub description: Option<String>,
    /// Raw JSON metadata.
    pub extra_data: Option<String>,
    /// Category code.
    pub subcategory_id: String,
    /// Price read from `extra_data`, when present and well formed.
    pub catalog_price: Option<Price>,
}

impl From<Product> for ProductRef {
    fn from(p: Product) -> Self {
        let catalog_price = p.extra_data.as_deref().and_then(catalog_price);
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            extra_data: p.extra_data,
            subcategory_id: p.subcategory_id,
            catalog_price,
        }
    }
}

/// Reads `prix_livre` (string or number) from a product's JSON metadata,
/// falling back to `list_price`.
pub fn catalog_price(extra_data: &str) -> Option<Price> {
    let json: Value = serde_json::from_str(extra_data).ok()?;
    let value = json
        .get(LIST_PRICE_KEY)
        .or_else(|| json.get(LEGACY_LIST_PRICE_KEY))?;
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match raw.parse::<Price>() {
        Ok(price) => Some(price),
        Err(e) => {
            debug!(%raw, error = %e, "ignoring malformed catalog price");
            None
        }
    }
}

/// A provider stock already in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingStock {
    /// Stock id.
    pub id: i32,
    /// Owning offer.
    pub offer_id: i32,
    /// Total units, bookings included; `None` is unlimited.
    pub quantity: Option<i32>,
    /// Stored price.
    pub price: Price,
    /// Units held by non-cancelled bookings.
    pub booking_quantity: i64,
}

impl ExistingStock {
    /// True when every unit is booked.
    pub fn is_sold_out(&self) -> bool {
        self.quantity
            .is_some_and(|q| i64::from(q) <= self.booking_quantity)
    }
}

/// Bulk reads by reference set and bulk writes over the catalog.
pub trait CatalogRepo {
    /// Terms-of-use compatible products keyed by provider reference.
    fn products_by_references(
        &self,
        conn: &mut SqliteConnection,
        references: &[String],
    ) -> RepoResult<HashMap<String, ProductRef>>;

    /// Offer ids keyed by provider reference.
    fn offer_ids_by_references(
        &self,
        conn: &mut SqliteConnection,
        references: &[String],
    ) -> RepoResult<HashMap<String, i32>>;

    /// Stocks keyed by provider reference, with their booked quantity.
    fn stocks_by_references(
        &self,
        conn: &mut SqliteConnection,
        references: &[String],
    ) -> RepoResult<HashMap<String, ExistingStock>>;

    /// Sets `last_provider_id` on the given offers. Returns rows touched.
    fn retag_offers(
        &self,
        conn: &mut SqliteConnection,
        offer_ids: &[i32],
        provider_id: Option<i32>,
    ) -> RepoResult<usize>;

    /// Inserts offers in bulk. Returns rows inserted.
    fn insert_offers(&self, conn: &mut SqliteConnection, offers: &[NewOffer]) -> RepoResult<usize>;

    /// Inserts stocks in bulk. Returns rows inserted.
    fn insert_stocks(&self, conn: &mut SqliteConnection, stocks: &[NewStock]) -> RepoResult<usize>;

    /// Applies `(stock id, changes)` pairs. Returns rows updated.
    fn update_stocks(
        &self,
        conn: &mut SqliteConnection,
        updates: &[(i32, StockUpdate)],
    ) -> RepoResult<usize>;
}
