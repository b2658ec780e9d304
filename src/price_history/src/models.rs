//! Diesel models mapping to the database schema.
//!
//! These types mirror the tables defined in the embedded migrations and in
//! [`crate::schema`]:
//! - [`crate::schema::snapshot_group`]: one bucket per (source, capture second)
//! - [`crate::schema::entity_record`]: one entity's value and attributes inside a bucket

pub mod snapshot;
