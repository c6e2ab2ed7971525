//! Provider reference resolution.
//!
//! Turns the three reference sets of a batch into catalog rows, in bulk. A
//! reference missing from the catalog is simply absent from the table.

use std::collections::HashMap;

use diesel::SqliteConnection;

use crate::catalog::{CatalogRepo, ExistingStock, ProductRef, RepoResult};

/// What the catalog knows about the references of one batch.
///
/// Built step by step as the batch progresses: products first, then existing
/// offers (merged with the offers created by the run), then stocks.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    products: HashMap<String, ProductRef>,
    offers: HashMap<String, i32>,
    stocks: HashMap<String, ExistingStock>,
}

impl ReferenceTable {
    /// Starts a table from resolved products.
    pub fn new(products: HashMap<String, ProductRef>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Returns the table with `offers` merged into the known offers.
    pub fn with_offers(mut self, offers: HashMap<String, i32>) -> Self {
        self.offers.extend(offers);
        self
    }

    /// Returns the table with `stocks` merged into the known stocks.
    pub fn with_stocks(mut self, stocks: HashMap<String, ExistingStock>) -> Self {
        self.stocks.extend(stocks);
        self
    }

    /// Product for a product reference.
    pub fn product(&self, reference: &str) -> Option<&ProductRef> {
        self.products.get(reference)
    }

    /// Offer id for an offer reference.
    pub fn offer_id(&self, reference: &str) -> Option<i32> {
        self.offers.get(reference).copied()
    }

    /// Existing stock for a stock reference.
    pub fn stock(&self, reference: &str) -> Option<&ExistingStock> {
        self.stocks.get(reference)
    }
}

/// Resolves product references; only products compatible with the terms of use resolve.
pub fn resolve_products<R: CatalogRepo + ?Sized>(
    repo: &R,
    conn: &mut SqliteConnection,
    references: &[String],
) -> RepoResult<HashMap<String, ProductRef>> {
    if references.is_empty() {
        return Ok(HashMap::new());
    }
    repo.products_by_references(conn, references)
}

/// Resolves offer references to offer ids.
pub fn resolve_offers<R: CatalogRepo + ?Sized>(
    repo: &R,
    conn: &mut SqliteConnection,
    references: &[String],
) -> RepoResult<HashMap<String, i32>> {
    if references.is_empty() {
        return Ok(HashMap::new());
    }
    repo.offer_ids_by_references(conn, references)
}

/// Resolves stock references, booked quantities included.
pub fn resolve_stocks<R: CatalogRepo + ?Sized>(
    repo: &R,
    conn: &mut SqliteConnection,
    references: &[String],
) -> RepoResult<HashMap<String, ExistingStock>> {
    if references.is_empty() {
        return Ok(HashMap::new());
    }
    repo.stocks_by_references(conn, references)
}
