//! Wall-clock helpers for schedules configured in local time.
//!
//! Everything persisted is UTC. Local times only exist at the configuration edge
//! (`schedule.at` + `schedule.timezone`), and two DST edge cases need a rule:
//! - a skipped local time (spring forward) moves to the first valid minute after the gap;
//! - a repeated local time (fall back) takes its first occurrence.
//!
//! With both rules every calendar day maps to exactly one instant.

use anyhow::{Context, anyhow};
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Longest DST gap searched when shifting a skipped local time forward.
const MAX_GAP_MINUTES: i64 = 120;

/// Parses an RFC-3339 timestamp (any offset) into UTC.
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Converts `naive` read on a clock in `tz` to UTC, resolving DST edge cases as
/// described in the module docs.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, _) => Ok(first.with_timezone(&Utc)),
        LocalResult::None => (1..=MAX_GAP_MINUTES)
            .map(|m| naive + chrono::Duration::minutes(m))
            .find_map(|t| tz.from_local_datetime(&t).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                anyhow!("no valid time within {MAX_GAP_MINUTES}m after {naive} in {}", tz.name())
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::{America::New_York, Europe::Berlin};

    fn local(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn rfc3339_with_offset_becomes_utc() {
        let got = parse_ts_to_utc("2024-06-01T14:00:00+02:00").unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        assert!(parse_ts_to_utc("2024-06-01 14:00").is_err());
    }

    #[test]
    fn ordinary_noon_in_berlin() {
        let got = local_to_utc(local(2024, 1, 15, 12, 0), Berlin).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap());
    }

    #[test]
    fn skipped_time_moves_past_the_gap() {
        // New York goes 02:00 -> 03:00 on 2024-03-10; 03:00 EDT is 07:00Z.
        let got = local_to_utc(local(2024, 3, 10, 2, 30), New_York).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn repeated_time_takes_first_occurrence() {
        // 01:30 happens at 05:30Z (EDT) and again at 06:30Z (EST) on 2024-11-03.
        let got = local_to_utc(local(2024, 11, 3, 1, 30), New_York).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }
}
