//! Price history tracker.
//!
//! Periodically captures prices from configured sources, appends each capture to a
//! durable hierarchical snapshot store, and rebuilds per-(entity, source) time series
//! from that store on demand.
//!
//! - [`store::SnapshotStore`] persists observations (create-or-overwrite per
//!   `(source, second, entity)`).
//! - [`reconstruct::rebuild`] turns the store back into chronologically ordered series.
//! - [`scheduler::IngestionScheduler`] drives acquire, append, rebuild and export cycles.
//! - [`config`] loads the TOML describing sources, cadence and paths.

#![warn(missing_docs)]

pub mod config;
pub mod db;
pub mod errors;
pub mod keys;
pub mod models;
pub mod reconstruct;
pub mod scheduler;
pub mod schema;
pub mod store;
pub mod tz;
