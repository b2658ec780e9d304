//! Durable, append-oriented snapshot store.
//!
//! Layout: one SQLite file per deployment. A Snapshot Group row exists per
//! `(source, capture second)` and owns one Entity Record per normalized entity name.
//! Each record carries its value plus the redundant `name`, `price`, `captured_at`
//! and `source` attributes that the reconstructor reads back.
//!
//! ## Write discipline
//! - Every [`SnapshotStore::append`] opens its own connection and drops it on every
//!   exit path, so a failed cycle leaves nothing held open.
//! - Appends from one `SnapshotStore` are serialized by an in-process mutex; other
//!   processes are serialized by SQLite's write lock plus the busy timeout.
//! - The group and record upserts run inside one `BEGIN IMMEDIATE` transaction: either
//!   the full record with all attributes lands, or nothing does.

use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use diesel::{SqliteConnection, prelude::*};
use price_feed::models::observation::Observation;
use tracing::{debug, info};

use crate::{
    db::{connection::connect_sqlite, migrate},
    errors::{BoxError, StoreError},
    keys::{format_captured_at, group_name, normalize_entity_name},
    models::snapshot::{EntityRecordRow, NewSnapshotGroup},
};

/// What an append did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Group the record landed in.
    pub group_name: String,
    /// Normalized record name.
    pub record_name: String,
    /// `true` for a new record, `false` when an existing one was overwritten.
    pub created: bool,
}

/// Owner of the snapshot file and every write to it.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// A fully validated record, prepared in memory before any I/O happens.
struct StagedRecord<'a> {
    group_name: String,
    record_name: String,
    captured_at: String,
    obs: &'a Observation,
}

impl SnapshotStore {
    /// Binds the store to `path`. Nothing touches disk until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` once the backing file has been created.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persists one observation with create-or-overwrite semantics.
    ///
    /// The record is keyed by `(source, captured_at to the second, normalized entity)`;
    /// appending the same key twice keeps exactly one record holding the latest price
    /// and attributes.
    ///
    /// Errors:
    /// - [`StoreError::InvalidObservation`] for an empty entity or source, or a non-finite price
    /// - [`StoreError::IoFailure`] when the file cannot be opened, migrated or written
    pub fn append(&self, obs: &Observation) -> Result<AppendOutcome, StoreError> {
        let staged = StagedRecord::stage(obs)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut conn = self.open_for_write()?;

        let created = conn
            .immediate_transaction::<_, diesel::result::Error, _>(|conn| staged.commit(conn))
            .map_err(|e| self.io_failure("writing", e))?;

        info!(
            group = %staged.group_name,
            record = %staged.record_name,
            price = obs.price,
            created,
            "observation stored"
        );

        Ok(AppendOutcome {
            group_name: staged.group_name,
            record_name: staged.record_name,
            created,
        })
    }

    /// Number of groups and records currently stored; `(0, 0)` when the file is absent.
    pub fn counts(&self) -> Result<(i64, i64), StoreError> {
        use crate::schema::{entity_record::dsl as er, snapshot_group::dsl as sg};

        if !self.exists() {
            return Ok((0, 0));
        }
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut conn = self.open_for_write()?;
        let groups = sg::snapshot_group
            .count()
            .get_result(&mut conn)
            .map_err(|e| self.io_failure("counting", e))?;
        let records = er::entity_record
            .count()
            .get_result(&mut conn)
            .map_err(|e| self.io_failure("counting", e))?;
        Ok((groups, records))
    }

    fn open_for_write(&self) -> Result<SqliteConnection, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_failure("creating parent of", e))?;
        }
        let url = self.url()?;
        let mut conn = connect_sqlite(url).map_err(|e| self.io_failure("opening", e))?;
        migrate::run_pending(&mut conn).map_err(|e| self.io_failure("migrating", e))?;
        debug!(path = %self.path.display(), "store opened for write");
        Ok(conn)
    }

    pub(crate) fn url(&self) -> Result<&str, StoreError> {
        self.path.to_str().ok_or_else(|| StoreError::IoFailure {
            action: "resolving",
            path: self.path.display().to_string(),
            source: "store path is not valid UTF-8".into(),
        })
    }

    fn io_failure(&self, action: &'static str, source: impl Into<BoxError>) -> StoreError {
        StoreError::IoFailure {
            action,
            path: self.path.display().to_string(),
            source: source.into(),
        }
    }
}

impl<'a> StagedRecord<'a> {
    fn stage(obs: &'a Observation) -> Result<Self, StoreError> {
        if obs.entity.trim().is_empty() {
            return Err(invalid("entity is empty"));
        }
        if obs.source.trim().is_empty() {
            return Err(invalid("source is empty"));
        }
        if !obs.price.is_finite() {
            return Err(invalid(format!(
                "price for {} from {} is not finite ({})",
                obs.entity, obs.source, obs.price
            )));
        }

        Ok(Self {
            group_name: group_name(&obs.source, obs.captured_at),
            record_name: normalize_entity_name(&obs.entity),
            captured_at: format_captured_at(obs.captured_at),
            obs,
        })
    }

    /// Resolves or creates the group, then creates or overwrites the record.
    /// Returns whether the record was newly created.
    fn commit(&self, conn: &mut SqliteConnection) -> QueryResult<bool> {
        use crate::schema::{entity_record::dsl as er, snapshot_group::dsl as sg};

        let group = NewSnapshotGroup {
            name: &self.group_name,
            source: &self.obs.source,
            captured_at: &self.captured_at,
        };

        // Insert .. ON CONFLICT (name) DO UPDATE .. RETURNING id (Sqlite 3.35+)
        let group_id: i32 = diesel::insert_into(sg::snapshot_group)
            .values(&group)
            .on_conflict(sg::name)
            .do_update()
            .set(&group)
            .returning(sg::id)
            .get_result(conn)?;

        let row = EntityRecordRow {
            group_id,
            record_name: &self.record_name,
            value: self.obs.price,
            attr_name: Some(&self.obs.entity),
            attr_price: Some(self.obs.price),
            attr_captured_at: Some(&self.captured_at),
            attr_source: Some(&self.obs.source),
        };

        let existing: Option<i32> = er::entity_record
            .filter(er::group_id.eq(group_id).and(er::record_name.eq(&self.record_name)))
            .select(er::id)
            .first(conn)
            .optional()?;

        match existing {
            Some(id) => {
                diesel::update(er::entity_record.find(id))
                    .set(&row)
                    .execute(conn)?;
                Ok(false)
            }
            None => {
                diesel::insert_into(er::entity_record)
                    .values(&row)
                    .execute(conn)?;
                Ok(true)
            }
        }
    }
}

fn invalid(reason: impl Into<String>) -> StoreError {
    StoreError::InvalidObservation {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn obs(entity: &str, price: f64, source: &str) -> Observation {
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        Observation::new(entity, price, source, t)
    }

    #[test]
    fn new_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/prices.db"));
        assert!(!store.exists());
        assert_eq!(store.counts().unwrap(), (0, 0));
        assert!(!store.exists());
    }

    #[test]
    fn first_append_creates_file_and_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("crypto_data/prices.db"));

        let out = store.append(&obs("Bitcoin", 65000.0, "CoinMarketCap")).unwrap();
        assert!(store.exists());
        assert!(out.created);
        assert_eq!(out.group_name, "CoinMarketCap_2024-07-01_12-00-00");
        assert_eq!(out.record_name, "Bitcoin");
        assert_eq!(store.counts().unwrap(), (1, 1));
    }

    #[test]
    fn rejects_invalid_observations_without_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("prices.db"));

        for bad in [
            obs("", 1.0, "CoinMarketCap"),
            obs("Bitcoin", 1.0, "  "),
            obs("Bitcoin", f64::NAN, "CoinMarketCap"),
            obs("Bitcoin", f64::INFINITY, "CoinMarketCap"),
        ] {
            let err = store.append(&bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidObservation { .. }), "{err}");
        }
        assert!(!store.exists());
    }

    #[test]
    fn zero_price_is_still_a_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("prices.db"));
        assert!(store.append(&obs("XRP", 0.0, "CoinMarketCap-XRP")).is_ok());
    }

    #[test]
    fn unopenable_path_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let store = SnapshotStore::new(dir.path());
        let err = store.append(&obs("Bitcoin", 1.0, "CoinMarketCap")).unwrap_err();
        assert!(matches!(err, StoreError::IoFailure { .. }), "{err}");
    }
}
