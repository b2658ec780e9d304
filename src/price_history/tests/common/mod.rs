#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use price_feed::models::observation::Observation;
use price_history::db::connection;
use price_history::store::SnapshotStore;
use tempfile::TempDir;

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

pub struct TestStore {
    _dir: TempDir, // keep alive for the life of the test
    pub store: SnapshotStore,
}

impl TestStore {
    pub fn path_str(&self) -> String {
        self.store.path().to_string_lossy().to_string()
    }

    /// Raw read-write connection to the store file, PRAGMAs applied.
    pub fn raw_conn(&self) -> SqliteConnection {
        connection::connect_sqlite(&self.path_str()).expect("connect")
    }
}

/// Store bound to `<tmpdir>/crypto_data/prices.db`; nothing is created yet.
pub fn temp_store() -> TestStore {
    let dir = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(dir.path().join("crypto_data").join("prices.db"));
    TestStore { _dir: dir, store }
}

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn obs(entity: &str, price: f64, source: &str, captured_at: DateTime<Utc>) -> Observation {
    Observation::new(entity, price, source, captured_at)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);
}
