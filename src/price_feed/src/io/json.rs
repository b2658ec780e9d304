//! File sink that exports each series as a JSON document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snafu::ResultExt;
use tracing::info;

use crate::{
    io::sink::{ConversionSnafu, SeriesSink, SinkError, WriteSnafu},
    models::series::{SeriesKey, SeriesMap},
};

/// A trend needs at least two points to be worth drawing.
pub const DEFAULT_MIN_POINTS: usize = 2;

/// Writes `<dir>/<entity>__<source>_time_series.json` per series (see [`file_stem`]).
pub struct JsonSeriesSink {
    dir: PathBuf,
    min_points: usize,
}

impl JsonSeriesSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            min_points: DEFAULT_MIN_POINTS,
        }
    }

    /// Overrides the minimum number of points a series needs to be exported.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Separator between the encoded entity and source in a file stem.
const STEM_SEPARATOR: &str = "__";

/// File stem for a series.
///
/// Distinct keys always get distinct stems. ASCII letters, digits and `.` are kept;
/// `_` becomes `_u`, space `_s`, `-` `_h`, and any other character `_x<hex>.`. No
/// escape starts with a second `_`, so the `__` separator cannot be forged.
pub fn file_stem(key: &SeriesKey) -> String {
    format!(
        "{}{STEM_SEPARATOR}{}",
        encode_stem_part(&key.entity),
        encode_stem_part(&key.source)
    )
}

fn encode_stem_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' => out.push(c),
            '_' => out.push_str("_u"),
            ' ' => out.push_str("_s"),
            '-' => out.push_str("_h"),
            other => out.push_str(&format!("_x{:x}.", u32::from(other))),
        }
    }
    out
}

#[async_trait]
impl SeriesSink for JsonSeriesSink {
    type Output = Vec<PathBuf>;

    async fn write(&self, series: &SeriesMap) -> Result<Self::Output, SinkError> {
        let dir_str = self.dir.display().to_string();
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context(WriteSnafu { path: &dir_str })?;

        let mut written = Vec::new();
        for (key, s) in series {
            if s.len() < self.min_points {
                continue;
            }
            let path = self.dir.join(format!("{}_time_series.json", file_stem(key)));
            let body = serde_json::to_vec_pretty(s).context(ConversionSnafu)?;
            tokio::fs::write(&path, body).await.context(WriteSnafu {
                path: path.display().to_string(),
            })?;
            info!(path = %path.display(), points = s.len(), "exported series");
            written.push(path);
        }
        Ok(written)
    }
}
