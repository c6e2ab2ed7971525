//! Search reindex signals.
//!
//! An updated stock asks for its offer to be reindexed when its price changes
//! or when it crosses the sold-out boundary. The ids are forwarded once, after
//! commit, to an [`Indexer`]. Forwarding is best-effort: a failure is logged
//! and the committed catalog changes stay.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel::{SqliteConnection, insert_into};
use tracing::{info, warn};

use crate::{
    catalog::ExistingStock, db::connection::connect_sqlite, models::QueuedOffer, price::Price,
    schema::offer_index_queue, timestamp,
};

/// True when updating `existing` to `new_price` and `new_available` changes
/// what search shows for its offer.
pub fn should_reindex(existing: &ExistingStock, new_price: Price, new_available: i32) -> bool {
    existing.price != new_price || existing.is_sold_out() != (new_available == 0)
}

/// Receives the offers whose search documents are stale.
pub trait Indexer {
    /// Called at most once per committed batch, never with an empty set.
    fn notify_offers_changed(&mut self, offer_ids: &BTreeSet<i32>) -> anyhow::Result<()>;
}

/// Logs the ids and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndexer;

impl Indexer for LogIndexer {
    fn notify_offers_changed(&mut self, offer_ids: &BTreeSet<i32>) -> anyhow::Result<()> {
        info!(count = offer_ids.len(), ?offer_ids, "offers to reindex");
        Ok(())
    }
}

/// Enqueues ids in `offer_index_queue` for an external indexer to consume.
///
/// Holds its own connection so enqueuing happens outside the batch transaction.
pub struct QueueIndexer {
    conn: SqliteConnection,
}

impl QueueIndexer {
    /// Opens a dedicated connection to `database_url`.
    pub fn connect(database_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            conn: connect_sqlite(database_url)?,
        })
    }
}

impl Indexer for QueueIndexer {
    fn notify_offers_changed(&mut self, offer_ids: &BTreeSet<i32>) -> anyhow::Result<()> {
        let now = timestamp::now();
        self.conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            for id in offer_ids {
                let row = QueuedOffer {
                    offer_id: *id,
                    enqueued_at: now.clone(),
                };
                insert_into(offer_index_queue::table)
                    .values(&row)
                    .on_conflict(offer_index_queue::offer_id)
                    .do_update()
                    .set(offer_index_queue::enqueued_at.eq(&now))
                    .execute(conn)?;
            }
            Ok(())
        })?;
        info!(count = offer_ids.len(), "offers enqueued for reindexing");
        Ok(())
    }
}

/// Forwards `offer_ids` to `indexer`. Returns false when the indexer failed.
pub fn emit(indexer: &mut dyn Indexer, offer_ids: &BTreeSet<i32>) -> bool {
    if offer_ids.is_empty() {
        return true;
    }
    match indexer.notify_offers_changed(offer_ids) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, count = offer_ids.len(), "reindex signal failed, catalog changes kept");
            false
        }
    }
}
