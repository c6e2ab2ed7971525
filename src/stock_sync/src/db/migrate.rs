//! Embedded schema migrations.

use anyhow::anyhow;
use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by [`run_sqlite`] to bring the catalog schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on the SQLite database at the given path.
///
/// `sqlite:` and `sqlite://` prefixes are accepted and stripped.
pub fn run_sqlite(url: &str) -> anyhow::Result<()> {
    let path = sqlite_path(url);
    if path.is_empty() {
        anyhow::bail!("Unsupported DATABASE_URL: {url:?}");
    }
    let mut conn = SqliteConnection::establish(path)?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")?;
    run_pending(&mut conn)
}

/// Applies pending migrations on an already open connection.
pub fn run_pending(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;
    Ok(())
}

/// Strips a `sqlite:` scheme, if any.
pub fn sqlite_path(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}
