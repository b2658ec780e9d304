//! Canonical in-memory representation of one captured price.
//!
//! This struct is the standard output of every [`PriceProvider`](crate::providers::PriceProvider)
//! and the unit the snapshot store ingests, regardless of where the price came from.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped price reading for one entity from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Canonical name of the measured thing (e.g. "Bitcoin").
    pub entity: String,

    /// Measured value.
    pub price: f64,

    /// Identifier of the acquisition channel (e.g. "CoinMarketCap-ETH").
    pub source: String,

    /// Wall-clock capture time (UTC).
    pub captured_at: DateTime<Utc>,
}

impl Observation {
    /// Builds an observation, truncating `captured_at` to whole seconds.
    pub fn new(
        entity: impl Into<String>,
        price: f64,
        source: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity: entity.into(),
            price,
            source: source.into(),
            captured_at: captured_at.trunc_subsecs(0),
        }
    }
}
