//! Chronologically ordered price history for one (entity, source) pair.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a [`Series`]: the entity name as captured plus the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Entity name (e.g. "Bitcoin").
    pub entity: String,
    /// Source identifier (e.g. "CoinMarketCap").
    pub source: String,
}

impl SeriesKey {
    /// Convenience constructor.
    pub fn new(entity: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            source: source.into(),
        }
    }
}

/// A single `(captured_at, price)` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Capture time (UTC, second resolution).
    pub captured_at: DateTime<Utc>,
    /// Price at that time.
    pub price: f64,
}

/// Represents the full history of one entity as reported by one source.
///
/// Points are kept in ascending `captured_at` order once [`Series::sort`] has run;
/// the reconstructor always sorts before handing a series out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// The entity this history describes.
    pub entity: String,
    /// The source the prices were captured from.
    pub source: String,
    /// The collection of points.
    pub points: Vec<SeriesPoint>,
}

impl Series {
    /// Creates an empty series for `key`.
    pub fn empty(key: &SeriesKey) -> Self {
        Self {
            entity: key.entity.clone(),
            source: key.source.clone(),
            points: Vec::new(),
        }
    }

    /// Key identifying this series.
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.entity.clone(), self.source.clone())
    }

    /// Appends a point without reordering.
    pub fn push(&mut self, captured_at: DateTime<Utc>, price: f64) {
        self.points.push(SeriesPoint { captured_at, price });
    }

    /// Stable sort by capture time, ascending.
    pub fn sort(&mut self) {
        self.points.sort_by_key(|p| p.captured_at);
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` when the series has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as plain `(time, price)` pairs.
    pub fn pairs(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.points.iter().map(|p| (p.captured_at, p.price)).collect()
    }
}

/// All reconstructed series keyed by `(entity, source)`.
pub type SeriesMap = BTreeMap<SeriesKey, Series>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn sort_orders_points_by_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let key = SeriesKey::new("XRP", "CoinMarketCap-XRP");
        let mut s = Series::empty(&key);
        s.push(t0 + Duration::hours(2), 0.52);
        s.push(t0, 0.50);
        s.push(t0 + Duration::hours(1), 0.51);
        s.sort();

        assert_eq!(
            s.pairs(),
            vec![
                (t0, 0.50),
                (t0 + Duration::hours(1), 0.51),
                (t0 + Duration::hours(2), 0.52),
            ]
        );
        assert_eq!(s.key(), key);
    }
}
