use thiserror::Error;

/// Boxed cause carried by I/O style failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`SnapshotStore::append`](crate::store::SnapshotStore::append).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The observation cannot be stored (empty entity or source, non-finite price).
    #[error("invalid observation: {reason}")]
    InvalidObservation {
        /// What is wrong with it.
        reason: String,
    },

    /// The backing file could not be opened, migrated or written.
    #[error("snapshot store I/O failure while {action} {path}: {source}")]
    IoFailure {
        /// Step that failed (e.g. "opening", "writing").
        action: &'static str,
        /// Store file path.
        path: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },
}

/// Errors produced while reconstructing series.
///
/// [`ReconstructError::CorruptRecord`] never ends a rebuild; those are collected in
/// [`Reconstruction::skipped`](crate::reconstruct::Reconstruction::skipped). The other
/// variants mean there is nothing to reconstruct.
#[derive(Debug, Error)]
pub enum ReconstructError {
    /// The store file exists but cannot be opened for reading.
    #[error("cannot open snapshot store {path}: {source}")]
    Open {
        /// Store file path.
        path: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Scanning the groups or records failed.
    #[error("failed to scan snapshot store: {0}")]
    Query(#[from] diesel::result::Error),

    /// One record lacks required metadata; it was skipped.
    #[error("corrupt record {group}/{record}: {problem}")]
    CorruptRecord {
        /// Group holding the record.
        group: String,
        /// Record name within the group.
        record: String,
        /// Which attribute is missing or malformed.
        problem: String,
    },
}
