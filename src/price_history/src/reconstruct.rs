//! Rebuilds per-(entity, source) price histories from the snapshot store.
//!
//! The scan is read-only and stateless between calls:
//! 1. every record is read together with its group name (for diagnostics only); a
//!    record whose group row is gone is reported, not silently dropped;
//! 2. the record's own `name`, `source`, `price` and `captured_at` attributes decide
//!    which series it belongs to, never the group name;
//! 3. each series is sorted by parsed capture time before it is returned, since the
//!    storage iteration order says nothing about chronology.
//!
//! Records missing an attribute are skipped and reported; they never abort the scan.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use diesel::{
    QueryableByName, SqliteConnection, prelude::*, sql_query, sql_types::BigInt,
};
use price_feed::models::series::{Series, SeriesKey, SeriesMap};
use tracing::{info, warn};

use crate::{
    db::connection::connect_sqlite_read_only,
    errors::ReconstructError,
    keys::parse_captured_at,
    models::snapshot::StoredRecord,
    store::SnapshotStore,
};

/// Result of one [`rebuild`].
#[derive(Debug, Default)]
pub struct Reconstruction {
    /// Every series found, each sorted ascending by capture time.
    pub series: SeriesMap,
    /// Snapshot groups present in the store.
    pub groups_visited: usize,
    /// Entity records scanned, including skipped ones.
    pub records_visited: usize,
    /// One [`ReconstructError::CorruptRecord`] per skipped record.
    pub skipped: Vec<ReconstructError>,
}

impl Reconstruction {
    /// Number of records left out because of missing or malformed metadata.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Looks up one series.
    pub fn get(&self, entity: &str, source: &str) -> Option<&Series> {
        self.series.get(&SeriesKey::new(entity, source))
    }

    /// Total number of points across all series.
    pub fn point_count(&self) -> usize {
        self.series.values().map(Series::len).sum()
    }
}

#[derive(QueryableByName)]
struct TableCount {
    #[diesel(sql_type = BigInt)]
    cnt: i64,
}

/// Scans the whole store and returns chronologically ordered series.
///
/// An absent file, or one without the snapshot tables yet, yields an empty
/// [`Reconstruction`]. Failing to open or scan an existing file is the only hard error.
pub fn rebuild(store: &SnapshotStore) -> Result<Reconstruction, ReconstructError> {
    if !store.exists() {
        info!(path = %store.path().display(), "no snapshot data yet");
        return Ok(Reconstruction::default());
    }

    let path = store.path().display().to_string();
    let url = store.url().map_err(|e| ReconstructError::Open {
        path: path.clone(),
        source: e.into(),
    })?;
    let mut conn = connect_sqlite_read_only(url).map_err(|e| ReconstructError::Open {
        path: path.clone(),
        source: e.into(),
    })?;

    let out = conn.transaction::<_, ReconstructError, _>(scan)?;

    info!(
        path = %path,
        groups = out.groups_visited,
        records = out.records_visited,
        series = out.series.len(),
        skipped = out.skipped_count(),
        "reconstruction finished"
    );
    Ok(out)
}

fn scan(conn: &mut SqliteConnection) -> Result<Reconstruction, ReconstructError> {
    use crate::schema::{entity_record::dsl as er, snapshot_group::dsl as sg};

    let tables: TableCount = sql_query(
        "SELECT COUNT(*) AS cnt FROM sqlite_master
         WHERE type = 'table' AND name IN ('snapshot_group', 'entity_record')",
    )
    .get_result(conn)?;
    if tables.cnt < 2 {
        return Ok(Reconstruction::default());
    }

    let groups_visited: i64 = sg::snapshot_group.count().get_result(conn)?;
    let rows: Vec<(StoredRecord, Option<String>)> = er::entity_record
        .left_join(sg::snapshot_group)
        .select((StoredRecord::as_select(), sg::name.nullable()))
        .load(conn)?;

    let mut out = Reconstruction {
        groups_visited: usize::try_from(groups_visited).unwrap_or_default(),
        records_visited: rows.len(),
        ..Reconstruction::default()
    };

    let mut acc: BTreeMap<SeriesKey, Series> = BTreeMap::new();
    for (record, group) in rows {
        match read_point(&record, group.as_deref()) {
            Ok((key, at, price)) => {
                acc.entry(key)
                    .or_insert_with_key(Series::empty)
                    .push(at, price);
            }
            Err(e) => {
                warn!(%e, "skipping record");
                out.skipped.push(e);
            }
        }
    }

    for series in acc.values_mut() {
        series.sort();
    }
    out.series = acc;
    Ok(out)
}

/// Extracts `(key, captured_at, price)` from a record's own attributes.
fn read_point(
    record: &StoredRecord,
    group: Option<&str>,
) -> Result<(SeriesKey, DateTime<Utc>, f64), ReconstructError> {
    let group_label = group
        .map(str::to_string)
        .unwrap_or_else(|| format!("<group {}>", record.group_id));
    let corrupt = |problem: &str| ReconstructError::CorruptRecord {
        group: group_label.clone(),
        record: record.record_name.clone(),
        problem: problem.to_string(),
    };

    if group.is_none() {
        return Err(corrupt("owning group is missing"));
    }

    let name = non_blank(record.attr_name.as_deref()).ok_or_else(|| corrupt("missing name"))?;
    let source =
        non_blank(record.attr_source.as_deref()).ok_or_else(|| corrupt("missing source"))?;
    record.attr_price.ok_or_else(|| corrupt("missing price"))?;
    let raw_at = record
        .attr_captured_at
        .as_deref()
        .ok_or_else(|| corrupt("missing captured_at"))?;
    let at = parse_captured_at(raw_at)
        .ok_or_else(|| corrupt(&format!("unparseable captured_at {raw_at:?}")))?;

    Ok((SeriesKey::new(name, source), at, record.value))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}
