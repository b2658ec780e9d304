//! Identity strings used by the snapshot layout.
//!
//! - Group names are `"{source}_{YYYY-MM-DD_HH-MM-SS}"` (UTC, second resolution).
//! - Record names are entity names with spaces and hyphens replaced by `_`.
//! - The `captured_at` attribute is `YYYY-MM-DD HH:MM:SS` (UTC).
//!
//! Group names are identities only. Nothing parses a source back out of them; the
//! source is stored as its own column and attribute.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::tz;

/// Separator between the source and the timestamp in a group name.
pub const GROUP_DELIMITER: char = '_';

/// Timestamp part of a group name.
pub const GROUP_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Format of the `captured_at` record attribute.
pub const CAPTURED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record name for an entity: every space and hyphen becomes `_`.
pub fn normalize_entity_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Group identity for `(source, captured_at)`.
pub fn group_name(source: &str, captured_at: DateTime<Utc>) -> String {
    format!(
        "{source}{GROUP_DELIMITER}{}",
        captured_at.trunc_subsecs(0).format(GROUP_TIME_FORMAT)
    )
}

/// Value of the `captured_at` attribute.
pub fn format_captured_at(captured_at: DateTime<Utc>) -> String {
    captured_at
        .trunc_subsecs(0)
        .format(CAPTURED_AT_FORMAT)
        .to_string()
}

/// Parses a `captured_at` attribute; RFC-3339 values are accepted as well.
pub fn parse_captured_at(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), CAPTURED_AT_FORMAT)
        .map(|n| n.and_utc())
        .ok()
        .or_else(|| tz::parse_ts_to_utc(s.trim()).ok())
}
