use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::series::SeriesMap;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// An error occurred while trying to write the data (e.g., file I/O error).
    #[snafu(display("Failed to write {path}: {source}"))]
    Write {
        path: String,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// An error occurred while converting a `Series` into the destination format.
    #[snafu(display("Data conversion error: {source}"))]
    Conversion {
        source: serde_json::Error,
        backtrace: Backtrace,
    },
}

/// Consumer of reconstructed price histories (charting, export, ...).
#[async_trait]
pub trait SeriesSink {
    /// The type of output returned after a successful write operation.
    ///
    /// This makes the trait flexible. For example:
    /// - A file sink might return `Vec<PathBuf>`, the paths to the created files.
    /// - A dashboard push might return `usize`, the number of series accepted.
    type Output: Send;

    /// Hands every reconstructed series to the destination.
    ///
    /// # Arguments
    /// * `series` - Chronologically ordered series keyed by `(entity, source)`.
    async fn write(&self, series: &SeriesMap) -> Result<Self::Output, SinkError>;
}
