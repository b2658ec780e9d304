//! Price acquisition and hand-off types.
//!
//! - [`models`]: the [`Observation`](models::observation::Observation) unit of ingestion,
//!   configured [`SourceTarget`](models::source_target::SourceTarget)s and reconstructed
//!   [`Series`](models::series::Series).
//! - [`providers`]: the [`PriceProvider`](providers::PriceProvider) acquisition trait and
//!   its implementations.
//! - [`io`]: the [`SeriesSink`](io::sink::SeriesSink) trait consumers of reconstructed
//!   series implement, plus a JSON file sink.

pub mod io;
pub mod models;
pub mod providers;
