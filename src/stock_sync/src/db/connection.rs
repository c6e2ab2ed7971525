//! SQLite connection helpers.
//!
//! Provides [`connect_sqlite`] that opens a connection and applies the PRAGMAs the
//! synchronization relies on: WAL journaling, foreign_keys=ON, and a 5000ms busy_timeout.
//!
//! Example:
//! ```no_run
//! use stock_sync::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("stock_sync_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use super::migrate::sqlite_path;

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(sqlite_path(database_url))?;

    // Readers keep going while a batch holds the write lock.
    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}
