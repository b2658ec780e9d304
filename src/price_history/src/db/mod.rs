//! Database utilities for connections and schema migrations.
//!
//! This module provides:
//! - SQLite connection helpers: [`connection::connect_sqlite`] applies WAL, foreign_keys=ON
//!   and a 5000ms busy_timeout; [`connection::connect_sqlite_read_only`] opens a
//!   `query_only` connection for scans.
//! - Embedded Diesel migrations and runners: [`migrate::run_pending`] and [`migrate::run_sqlite`].
//!
//! Example:
//! ```no_run
//! use price_history::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("price_history_example.db");
//! let mut conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! migrate::run_pending(&mut conn).expect("migrations");
//! ```

pub mod connection;
pub mod migrate;
