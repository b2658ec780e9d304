//! Row types for snapshot groups and entity records.

use diesel::prelude::*;

use crate::schema::{entity_record, snapshot_group};

/// Insertable/updatable form of a [`snapshot_group`] row.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = snapshot_group)]
pub struct NewSnapshotGroup<'a> {
    /// `"{source}_{YYYY-MM-DD_HH-MM-SS}"`.
    pub name: &'a str,
    /// Source identifier, stored as-is.
    pub source: &'a str,
    /// `YYYY-MM-DD HH:MM:SS` (UTC).
    pub captured_at: &'a str,
}

/// Insertable/updatable form of an [`entity_record`] row.
///
/// Every attribute is written on both insert and overwrite, so an upserted record
/// always carries a complete, consistent set.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = entity_record, treat_none_as_null = true)]
pub struct EntityRecordRow<'a> {
    /// Owning group.
    pub group_id: i32,
    /// Normalized entity name.
    pub record_name: &'a str,
    /// The price.
    pub value: f64,
    /// Entity name as captured.
    pub attr_name: Option<&'a str>,
    /// Redundant copy of the price.
    pub attr_price: Option<f64>,
    /// Capture time attribute.
    pub attr_captured_at: Option<&'a str>,
    /// Source attribute.
    pub attr_source: Option<&'a str>,
}

/// A stored [`entity_record`] row as read back by the reconstructor.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = entity_record, check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoredRecord {
    /// Primary key.
    pub id: i32,
    /// Owning group.
    pub group_id: i32,
    /// Normalized entity name.
    pub record_name: String,
    /// The price.
    pub value: f64,
    /// Entity name attribute.
    pub attr_name: Option<String>,
    /// Price attribute.
    pub attr_price: Option<f64>,
    /// Capture time attribute.
    pub attr_captured_at: Option<String>,
    /// Source attribute.
    pub attr_source: Option<String>,
}
