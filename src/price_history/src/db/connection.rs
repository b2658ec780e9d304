//! SQLite connection helpers.

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

/// Open a SQLite connection and apply connection-wide PRAGMAs.
///
/// Creates the file when it does not exist yet.
pub fn connect_sqlite(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}

/// Open a connection that rejects every write (`PRAGMA query_only`).
///
/// Readers still take SQLite's shared lock for the duration of their transaction,
/// so a scan never observes a half-applied append.
pub fn connect_sqlite_read_only(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;

    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    sql_query("PRAGMA query_only=ON;").execute(&mut conn)?;
    Ok(conn)
}
