//! Provider stock synchronization.
//!
//! ## What this does
//! - Resolves the product, offer and stock references of a batch of
//!   [`StockDetail`]s against the catalog, in bulk.
//! - Creates the missing offers and stocks and updates the existing stocks,
//!   keeping `quantity = provider quantity + booked units`.
//! - Collects the offers whose search documents went stale and forwards them
//!   to an [`Indexer`] once the batch is committed.
//!
//! ## Transactions & consistency
//! Steps that read or write the catalog run inside a single **`BEGIN IMMEDIATE`**
//! transaction via `SqliteConnection::immediate_transaction`: the batch is
//! applied entirely or not at all. A persistence error rolls back and is
//! returned; retrying means resubmitting the whole batch. Stocks are not
//! locked row by row, so callers must not run two synchronizations for the
//! same venue and provider at once.
//!
//! ## Dry-run
//! When [`SyncOptions::dry_run`] is `true`, the batch is computed and written
//! inside the transaction, which is then rolled back. The summary reports what
//! would have changed and no reindex signal is sent.

pub mod mutate;
pub mod reindex;
pub mod resolve;

use std::{
    collections::BTreeSet,
    fmt,
    ops::{Add, AddAssign},
};

use diesel::SqliteConnection;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
    catalog::CatalogRepo,
    config::ValidationRules,
    detail::{StockBatch, StockDetail},
    models::Venue,
    timestamp,
};
use mutate::{SyncContext, drop_unresolved, existing_offer_ids, plan_offers, plan_stocks};
use reindex::{Indexer, emit};
use resolve::{ReferenceTable, resolve_offers, resolve_products, resolve_stocks};

/// Options for stock synchronization.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// If true, roll the batch back and report what would change.
    pub dry_run: bool,
    /// Limits applied to created offers and stocks.
    pub validation: ValidationRules,
}

/// Counts of rows written by a synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Offers created.
    pub new_offers: usize,
    /// Stocks created.
    pub new_stocks: usize,
    /// Existing stocks updated.
    pub updated_stocks: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "new_offers={} new_stocks={} updated_stocks={}",
            self.new_offers, self.new_stocks, self.updated_stocks
        )
    }
}

impl Add for SyncSummary {
    type Output = SyncSummary;

    fn add(self, rhs: SyncSummary) -> SyncSummary {
        SyncSummary {
            new_offers: self.new_offers + rhs.new_offers,
            new_stocks: self.new_stocks + rhs.new_stocks,
            updated_stocks: self.updated_stocks + rhs.updated_stocks,
        }
    }
}

impl AddAssign for SyncSummary {
    fn add_assign(&mut self, rhs: SyncSummary) {
        *self = *self + rhs;
    }
}

struct BatchOutcome {
    summary: SyncSummary,
    reindex: BTreeSet<i32>,
}

#[derive(Debug, Error)]
#[error("dry run rollback")]
struct DryRunRollback(SyncSummary);

/// Synchronize one batch of provider stock details for `venue`.
///
/// - Details are deduplicated by stock reference (last one wins).
/// - Details whose product is unknown are dropped.
/// - Existing offers are tagged with `provider_id`; missing offers and stocks
///   are created when something is available; existing stocks are updated.
/// - After commit, offers whose stock price changed or crossed the sold-out
///   boundary are sent to `indexer`. Its failure does not fail the call.
pub fn synchronize_stocks<R: CatalogRepo + ?Sized>(
    conn: &mut SqliteConnection,
    repo: &R,
    details: impl IntoIterator<Item = StockDetail>,
    venue: &Venue,
    provider_id: Option<i32>,
    indexer: &mut dyn Indexer,
    opt: &SyncOptions,
) -> anyhow::Result<SyncSummary> {
    let batch = StockBatch::new(details);
    if batch.is_empty() {
        return Ok(SyncSummary::default());
    }
    let received = batch.len();

    let result = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let outcome = apply_batch(conn, repo, batch, venue, provider_id, &opt.validation)?;
        if opt.dry_run {
            return Err(DryRunRollback(outcome.summary).into());
        }
        Ok(outcome)
    });

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let summary = e.downcast::<DryRunRollback>()?.0;
            info!(venue_id = venue.id, ?provider_id, received, %summary, "dry run, rolled back");
            return Ok(summary);
        }
    };

    info!(
        venue_id = venue.id,
        ?provider_id,
        received,
        new_offers = outcome.summary.new_offers,
        new_stocks = outcome.summary.new_stocks,
        updated_stocks = outcome.summary.updated_stocks,
        reindex = outcome.reindex.len(),
        "stock batch synchronized"
    );
    emit(indexer, &outcome.reindex);

    Ok(outcome.summary)
}

fn apply_batch<R: CatalogRepo + ?Sized>(
    conn: &mut SqliteConnection,
    repo: &R,
    mut batch: StockBatch,
    venue: &Venue,
    provider_id: Option<i32>,
    rules: &ValidationRules,
) -> anyhow::Result<BatchOutcome> {
    let now = timestamp::now();
    let ctx = SyncContext {
        venue,
        provider_id,
        rules,
        now: &now,
    };

    let products = resolve_products(repo, conn, &batch.product_references())?;
    let table = ReferenceTable::new(products);
    drop_unresolved(&mut batch, &table);
    if batch.is_empty() {
        return Ok(BatchOutcome {
            summary: SyncSummary::default(),
            reindex: BTreeSet::new(),
        });
    }

    let table = table.with_offers(resolve_offers(repo, conn, &batch.offer_references())?);
    repo.retag_offers(conn, &existing_offer_ids(&batch, &table), provider_id)?;

    let new_offers = plan_offers(&batch, &table, &ctx);
    let offers_created = repo.insert_offers(conn, &new_offers)?;
    let created_refs: Vec<String> = new_offers.into_iter().map(|o| o.id_at_providers).collect();
    let table = table.with_offers(resolve_offers(repo, conn, &created_refs)?);

    let table = table.with_stocks(resolve_stocks(repo, conn, &batch.stock_references())?);
    let plan = plan_stocks(&batch, &table, &ctx);
    let stocks_created = repo.insert_stocks(conn, &plan.new_stocks)?;
    let stocks_updated = repo.update_stocks(conn, &plan.updates)?;

    Ok(BatchOutcome {
        summary: SyncSummary {
            new_offers: offers_created,
            new_stocks: stocks_created,
            updated_stocks: stocks_updated,
        },
        reindex: plan.reindex,
    })
}
