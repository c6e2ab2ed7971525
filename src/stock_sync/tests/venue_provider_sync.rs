mod common;
use common::{
    RecordingIndexer, SIRET, count, seed_product, seed_provider, seed_venue, seed_venue_provider,
    setup_db, stock_by_ref, venue_ref,
};

use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use provider_feed::{FeedError, RawStock, StockPage, StockPageRequest, StockProvider};
use stock_sync::catalog::SqliteCatalog;
use stock_sync::config::SyncConfig;
use stock_sync::schema::venue_provider;
use stock_sync::sync::SyncSummary;
use stock_sync::timestamp;
use stock_sync::venue_provider::{VenueProviderTarget, synchronize_venue_provider};

const ISBN: &str = "9782070360024";
const ISBN2: &str = "9782070360031";

fn raw(reference: &str, available: Option<i64>, price: Option<&str>) -> RawStock {
    RawStock {
        reference: reference.into(),
        available,
        price: price.map(|p| BigDecimal::from_str(p).unwrap()),
    }
}

/// Serves fixed pages keyed by the `after` cursor and records every request.
struct StaticFeed {
    requests: Mutex<Vec<StockPageRequest>>,
}

impl StaticFeed {
    fn new() -> Self {
        Self {
            requests: Mutex::new(vec![]),
        }
    }

    fn requests(&self) -> Vec<StockPageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StockProvider for StaticFeed {
    async fn fetch_stocks(&self, request: &StockPageRequest) -> Result<StockPage, FeedError> {
        self.requests.lock().unwrap().push(request.clone());
        let stocks = match request.after.as_deref() {
            None => vec![
                raw(ISBN, Some(3), Some("1250")),
                raw("0000000000000", Some(1), Some("500")),
            ],
            Some("0000000000000") => vec![raw(ISBN2, Some(2), None), raw("no-quantity", None, None)],
            Some(_) => vec![],
        };
        Ok(StockPage {
            total: Some(4),
            limit: Some(u64::from(request.limit)),
            offset: None,
            stocks,
        })
    }
}

struct BrokenFeed;

#[async_trait]
impl StockProvider for BrokenFeed {
    async fn fetch_stocks(&self, _: &StockPageRequest) -> Result<StockPage, FeedError> {
        Err(FeedError::Api {
            status: 503,
            body: "maintenance".into(),
        })
    }
}

#[tokio::test]
async fn pages_until_empty_and_remembers_the_run() {
    let (_db, mut conn) = setup_db();
    let venue = seed_venue(&mut conn);
    let provider_id = seed_provider(&mut conn, "Titelive", true);
    let vp_id = seed_venue_provider(&mut conn, venue.id, provider_id);
    seed_product(&mut conn, ISBN, Some("14.00"));
    seed_product(&mut conn, ISBN2, Some("7.00"));
    let config = SyncConfig {
        page_size: 2,
        ..SyncConfig::default()
    };
    let feed = StaticFeed::new();
    let mut indexer = RecordingIndexer::default();

    let target = VenueProviderTarget::load(&mut conn, vp_id).unwrap();
    let got = synchronize_venue_provider(
        &mut conn,
        &SqliteCatalog::default(),
        &feed,
        &target,
        &mut indexer,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(
        got,
        SyncSummary {
            new_offers: 2,
            new_stocks: 2,
            updated_stocks: 0
        }
    );
    let first = stock_by_ref(&mut conn, &venue_ref(ISBN));
    assert_eq!((first.quantity, first.price_cents), (Some(3), 1250));
    assert_eq!(stock_by_ref(&mut conn, &venue_ref(ISBN2)).price_cents, 700);
    assert_eq!(first.last_provider_id, Some(provider_id));

    let requests = feed.requests();
    let cursors: Vec<Option<&str>> = requests.iter().map(|r| r.after.as_deref()).collect();
    assert_eq!(cursors, vec![None, Some("0000000000000"), Some("no-quantity")]);
    assert!(requests.iter().all(|r| r.siret == SIRET && r.limit == 2));
    assert!(requests.iter().all(|r| r.modified_since.is_none()));

    let stored: Option<String> = venue_provider::table
        .find(vp_id)
        .select(venue_provider::last_sync_date)
        .first(&mut conn)
        .unwrap();
    let since = timestamp::parse(&stored.expect("last_sync_date set")).unwrap();

    // The next run only asks for what changed since the previous one.
    let feed = StaticFeed::new();
    let target = VenueProviderTarget::load(&mut conn, vp_id).unwrap();
    let again = synchronize_venue_provider(
        &mut conn,
        &SqliteCatalog::default(),
        &feed,
        &target,
        &mut indexer,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(again.updated_stocks, 2);
    assert_eq!(count(&mut conn, "offer"), 2);
    assert_eq!(feed.requests()[0].modified_since, Some(since));
}

#[tokio::test]
async fn inactive_link_is_skipped() {
    let (_db, mut conn) = setup_db();
    let venue = seed_venue(&mut conn);
    let provider_id = seed_provider(&mut conn, "Titelive", false);
    let vp_id = seed_venue_provider(&mut conn, venue.id, provider_id);
    diesel::update(venue_provider::table.find(vp_id))
        .set(venue_provider::is_active.eq(false))
        .execute(&mut conn)
        .unwrap();
    let feed = StaticFeed::new();
    let mut indexer = RecordingIndexer::default();

    let target = VenueProviderTarget::load(&mut conn, vp_id).unwrap();
    let got = synchronize_venue_provider(
        &mut conn,
        &SqliteCatalog::default(),
        &feed,
        &target,
        &mut indexer,
        &SyncConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(got, SyncSummary::default());
    assert!(feed.requests().is_empty());
}

#[tokio::test]
async fn feed_failure_keeps_last_sync_date() {
    let (_db, mut conn) = setup_db();
    let venue = seed_venue(&mut conn);
    let provider_id = seed_provider(&mut conn, "Titelive", false);
    let vp_id = seed_venue_provider(&mut conn, venue.id, provider_id);
    let mut indexer = RecordingIndexer::default();

    let target = VenueProviderTarget::load(&mut conn, vp_id).unwrap();
    let err = synchronize_venue_provider(
        &mut conn,
        &SqliteCatalog::default(),
        &BrokenFeed,
        &target,
        &mut indexer,
        &SyncConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("fetching stocks"));
    let stored: Option<String> = venue_provider::table
        .find(vp_id)
        .select(venue_provider::last_sync_date)
        .first(&mut conn)
        .unwrap();
    assert_eq!(stored, None);
}

#[test]
fn unknown_link_is_an_error() {
    let (_db, mut conn) = setup_db();
    assert!(VenueProviderTarget::load(&mut conn, 42).is_err());
}

#[test]
fn api_client_is_built_from_the_provider_row() {
    let (_db, mut conn) = setup_db();
    let venue = seed_venue(&mut conn);
    let provider_id = seed_provider(&mut conn, "Titelive", false);
    let vp_id = seed_venue_provider(&mut conn, venue.id, provider_id);

    let target = VenueProviderTarget::load(&mut conn, vp_id).unwrap();
    assert_eq!(target.siret().unwrap(), SIRET);
    assert_eq!(
        target.api().unwrap().stocks_url(SIRET),
        format!("https://provider.example/stocks/{SIRET}")
    );
}
