#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;

use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use stock_sync::db::{connection, migrate};
use stock_sync::detail::StockDetail;
use stock_sync::models::{
    NewBooking, NewProduct, NewProvider, NewVenue, NewVenueProvider, Offer, Stock, Venue,
};
use stock_sync::price::Price;
use stock_sync::schema::{booking, offer, product, provider, stock, venue, venue_provider};
use stock_sync::sync::reindex::Indexer;
use tempfile::TempDir;

pub const SIRET: &str = "12345678900012";

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}
#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    n: i64,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    let c: Count = diesel::sql_query(format!("SELECT COUNT(*) AS n FROM {table}"))
        .get_result(conn)
        .unwrap();
    c.n
}

pub fn seed_venue(conn: &mut SqliteConnection) -> Venue {
    insert_into_venue(conn, "Librairie du Centre", Some(SIRET))
}

pub fn insert_into_venue(conn: &mut SqliteConnection, name: &str, siret: Option<&str>) -> Venue {
    diesel::insert_into(venue::table)
        .values(&NewVenue {
            name,
            siret,
            booking_email: Some("resa@librairie.example"),
            withdrawal_details: Some("Au comptoir"),
        })
        .returning(Venue::as_returning())
        .get_result(conn)
        .unwrap()
}

pub fn seed_provider(conn: &mut SqliteConnection, name: &str, prices_in_cents: bool) -> i32 {
    diesel::insert_into(provider::table)
        .values(&NewProvider {
            name,
            api_url: Some("https://provider.example/stocks"),
            auth_token: Some("t0k"),
            prices_in_cents,
            is_active: true,
        })
        .returning(provider::id)
        .get_result(conn)
        .unwrap()
}

pub fn seed_venue_provider(conn: &mut SqliteConnection, venue_id: i32, provider_id: i32) -> i32 {
    diesel::insert_into(venue_provider::table)
        .values(&NewVenueProvider {
            venue_id,
            provider_id,
            venue_id_at_offer_provider: None,
            is_active: true,
        })
        .returning(venue_provider::id)
        .get_result(conn)
        .unwrap()
}

/// A GCU compatible book whose catalog price is `prix_livre` (euros), if any.
pub fn seed_product(conn: &mut SqliteConnection, isbn: &str, prix_livre: Option<&str>) -> i32 {
    let extra = prix_livre.map(|p| format!(r#"{{"prix_livre": "{p}", "author": "Camus"}}"#));
    diesel::insert_into(product::table)
        .values(&NewProduct {
            name: &format!("Livre {isbn}"),
            description: Some("Roman"),
            extra_data: extra.as_deref(),
            subcategory_id: "LIVRE_PAPIER",
            id_at_providers: Some(isbn),
            gcu_compatible: true,
        })
        .returning(product::id)
        .get_result(conn)
        .unwrap()
}

pub fn venue_ref(isbn: &str) -> String {
    format!("{isbn}@{SIRET}")
}

pub fn detail(isbn: &str, available: i64, price: Option<&str>) -> StockDetail {
    StockDetail::new(
        isbn,
        venue_ref(isbn),
        venue_ref(isbn),
        available,
        price.map(|p| p.parse::<Price>().unwrap()),
    )
    .unwrap()
}

pub fn add_booking(conn: &mut SqliteConnection, stock_id: i32, quantity: i32, is_cancelled: bool) {
    diesel::insert_into(booking::table)
        .values(&NewBooking {
            stock_id,
            quantity,
            is_cancelled,
        })
        .execute(conn)
        .unwrap();
}

pub fn stock_by_ref(conn: &mut SqliteConnection, reference: &str) -> Stock {
    stock::table
        .filter(stock::id_at_providers.eq(reference))
        .select(Stock::as_select())
        .first(conn)
        .unwrap()
}

pub fn offer_by_ref(conn: &mut SqliteConnection, reference: &str) -> Offer {
    offer::table
        .filter(offer::id_at_providers.eq(reference))
        .select(Offer::as_select())
        .first(conn)
        .unwrap()
}

/// Records every notification; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingIndexer {
    pub calls: Rc<RefCell<Vec<BTreeSet<i32>>>>,
}

impl RecordingIndexer {
    pub fn all_ids(&self) -> BTreeSet<i32> {
        self.calls.borrow().iter().flatten().copied().collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Indexer for RecordingIndexer {
    fn notify_offers_changed(&mut self, offer_ids: &BTreeSet<i32>) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(offer_ids.clone());
        Ok(())
    }
}

pub struct FailingIndexer;

impl Indexer for FailingIndexer {
    fn notify_offers_changed(&mut self, _: &BTreeSet<i32>) -> anyhow::Result<()> {
        anyhow::bail!("search backend unavailable")
    }
}
