//! Insert and update planning for offers and stocks.
//!
//! Everything here is pure: a [`StockBatch`] and a [`ReferenceTable`] go in,
//! rows to write come out. Record-level problems (unknown product, rejected
//! entity, missing price) drop the record and are logged; they never fail the
//! batch.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, error, info, warn};

use super::{reindex::should_reindex, resolve::ReferenceTable};
use crate::{
    catalog::ProductRef,
    config::ValidationRules,
    detail::{StockBatch, StockDetail},
    models::{NewOffer, NewStock, StockUpdate, Venue},
    price::Price,
    validation::{validate_offer, validate_stock},
};

/// Fixed inputs of one synchronization run.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    /// Venue owning every offer of the batch.
    pub venue: &'a Venue,
    /// Provider running the sync, if any.
    pub provider_id: Option<i32>,
    /// Limits applied to created rows.
    pub rules: &'a ValidationRules,
    /// Timestamp written on every touched row.
    pub now: &'a str,
}

/// Drops details whose product did not resolve. Returns how many were dropped.
pub fn drop_unresolved(batch: &mut StockBatch, table: &ReferenceTable) -> usize {
    let before = batch.len();
    batch.retain(|d| {
        let known = table.product(d.products_provider_reference()).is_some();
        if !known {
            debug!(
                product_ref = d.products_provider_reference(),
                stock_ref = d.stocks_provider_reference(),
                "unknown product, skipping stock"
            );
        }
        known
    });
    let dropped = before - batch.len();
    if dropped > 0 {
        info!(dropped, kept = batch.len(), "dropped stocks with unresolved products");
    }
    dropped
}

/// Distinct ids of the batch offers already in the catalog.
pub fn existing_offer_ids(batch: &StockBatch, table: &ReferenceTable) -> Vec<i32> {
    let mut seen = HashSet::new();
    batch
        .iter()
        .filter_map(|d| table.offer_id(d.offers_provider_reference()))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Builds the offers to create for details whose offer does not exist yet.
///
/// Details with nothing available do not create offers. When several details
/// target the same unknown offer reference, the first one creates it.
pub fn plan_offers(batch: &StockBatch, table: &ReferenceTable, ctx: &SyncContext<'_>) -> Vec<NewOffer> {
    let mut planned: HashSet<&str> = HashSet::new();
    let mut offers = Vec::new();

    for detail in batch {
        let reference = detail.offers_provider_reference();
        if table.offer_id(reference).is_some() || detail.available_quantity() == 0 {
            continue;
        }
        if !planned.insert(reference) {
            debug!(offer_ref = reference, "offer already planned in this batch");
            continue;
        }
        let Some(product) = table.product(detail.products_provider_reference()) else {
            continue;
        };

        match validate_offer(new_offer(detail, product, ctx), ctx.rules) {
            Ok(offer) => offers.push(offer),
            Err(errors) => error!(
                offer_ref = reference,
                %errors,
                "offer rejected by validation, skipping"
            ),
        }
    }
    offers
}

fn new_offer(detail: &StockDetail, product: &ProductRef, ctx: &SyncContext<'_>) -> NewOffer {
    NewOffer {
        venue_id: ctx.venue.id,
        product_id: product.id,
        name: product.name.clone(),
        description: product.description.clone(),
        extra_data: product.extra_data.clone(),
        subcategory_id: product.subcategory_id.clone(),
        booking_email: ctx.venue.booking_email.clone(),
        withdrawal_details: ctx.venue.withdrawal_details.clone(),
        id_at_providers: detail.offers_provider_reference().to_string(),
        id_at_provider: detail.products_provider_reference().to_string(),
        last_provider_id: ctx.provider_id,
        date_modified: ctx.now.to_string(),
    }
}

/// Effective price of a detail: its own non-zero price, else the catalog price.
pub fn resolve_price(detail: &StockDetail, product: Option<&ProductRef>) -> Option<Price> {
    detail.price().or_else(|| product.and_then(|p| p.catalog_price))
}

/// Rows to write for the stocks of a batch, and the offers to reindex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockPlan {
    /// Stocks to create.
    pub new_stocks: Vec<NewStock>,
    /// `(stock id, changes)` for stocks already in the catalog.
    pub updates: Vec<(i32, StockUpdate)>,
    /// Offers whose updated stock changed in a search-relevant way.
    pub reindex: BTreeSet<i32>,
}

/// Plans stock creations and updates. `table` must already hold the offers
/// created by this run.
pub fn plan_stocks(batch: &StockBatch, table: &ReferenceTable, ctx: &SyncContext<'_>) -> StockPlan {
    let mut plan = StockPlan::default();

    for detail in batch {
        let stock_ref = detail.stocks_provider_reference();
        let product = table.product(detail.products_provider_reference());
        let Some(price) = resolve_price(detail, product) else {
            warn!(stock_ref, "no provider nor catalog price, skipping stock");
            continue;
        };
        let available = detail.available_quantity();

        match table.stock(stock_ref) {
            Some(existing) => {
                if detail.price().is_none() && existing.price != price {
                    warn!(
                        stock_id = existing.id,
                        previous_price = %existing.price,
                        new_price = %price,
                        "stock price replaced by catalog price"
                    );
                }

                let total = i64::from(available) + existing.booking_quantity;
                let Ok(quantity) = i32::try_from(total) else {
                    warn!(stock_id = existing.id, total, "stock quantity out of range, skipping");
                    continue;
                };

                if should_reindex(existing, price, available) {
                    plan.reindex.insert(existing.offer_id);
                }
                plan.updates.push((
                    existing.id,
                    StockUpdate {
                        quantity: Some(quantity),
                        raw_provider_quantity: Some(available),
                        price_cents: price.cents(),
                        last_provider_id: ctx.provider_id,
                        date_modified: ctx.now.to_string(),
                    },
                ));
            }
            None => {
                if available == 0 {
                    continue;
                }
                let Some(offer_id) = table.offer_id(detail.offers_provider_reference()) else {
                    debug!(
                        stock_ref,
                        offer_ref = detail.offers_provider_reference(),
                        "no offer for stock, skipping"
                    );
                    continue;
                };
                let stock = NewStock {
                    offer_id,
                    quantity: Some(available),
                    raw_provider_quantity: Some(available),
                    price_cents: price.cents(),
                    booking_limit_datetime: None,
                    id_at_providers: stock_ref.to_string(),
                    last_provider_id: ctx.provider_id,
                    date_modified: ctx.now.to_string(),
                };
                match validate_stock(stock, ctx.rules) {
                    Ok(stock) => plan.new_stocks.push(stock),
                    Err(errors) => error!(stock_ref, %errors, "stock rejected by validation, skipping"),
                }
            }
        }
    }
    plan
}
