//! Provider abstraction for price sources.
//!
//! This module defines the [`PriceProvider`] trait, the single acquisition capability
//! the ingestion scheduler talks to. Each configured source names a
//! [`ProviderKind`](crate::models::source_target::ProviderKind); [`build_provider`] maps
//! that kind to a concrete implementation at runtime, so adding a source never means
//! writing another near-identical scraping function.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use chrono::Utc;
//! use price_feed::models::{observation::Observation, source_target::SourceTarget};
//! use price_feed::providers::{PriceProvider, ProviderError};
//!
//! struct FixedPrice(f64);
//!
//! #[async_trait]
//! impl PriceProvider for FixedPrice {
//!     async fn fetch(&self, target: &SourceTarget) -> Result<Option<Observation>, ProviderError> {
//!         Ok(Some(Observation::new(&target.target, self.0, &target.id, Utc::now())))
//!     }
//! }
//! ```

pub mod coinmarketcap;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{
    observation::Observation,
    source_target::{ProviderKind, SourceTarget},
};

/// Trait for acquiring one price observation from a configured source.
///
/// `Ok(None)` means the source answered but had no price to offer this time;
/// every other miss is an explicit [`ProviderError`]. Implementations never encode
/// failure as a zero price.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetches the current price for `target`.
    async fn fetch(&self, target: &SourceTarget) -> Result<Option<Observation>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `PriceProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during the HTTP request (e.g., network failure, timeout).
    #[snafu(display("Request to {url} failed: {source}"))]
    Reqwest {
        url: String,
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The source answered with a non-success status code.
    #[snafu(display("{url} answered with HTTP {status}"))]
    Status {
        url: String,
        status: u16,
        backtrace: Backtrace,
    },

    /// The page was fetched but the price element could not be located.
    #[snafu(display("No price element found at {url}"))]
    Extraction { url: String, backtrace: Backtrace },

    /// The price element was found but its text is not a number.
    #[snafu(display("Unparseable price text {raw:?}: {source}"))]
    Parse {
        raw: String,
        source: std::num::ParseFloatError,
        backtrace: Backtrace,
    },
}

/// Build and return a boxed provider for the supplied kind.
pub fn build_provider(
    kind: ProviderKind,
) -> Result<Box<dyn PriceProvider>, ProviderInitError> {
    match kind {
        ProviderKind::CoinMarketCap => {
            let p = coinmarketcap::provider::CoinMarketCapProvider::new()?;
            Ok(Box::new(p))
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    struct Fixed;
    struct Down;

    #[async_trait]
    impl PriceProvider for Fixed {
        async fn fetch(
            &self,
            target: &SourceTarget,
        ) -> Result<Option<Observation>, ProviderError> {
            Ok(Some(Observation::new(&target.target, 1.5, &target.id, Utc::now())))
        }
    }

    #[async_trait]
    impl PriceProvider for Down {
        async fn fetch(
            &self,
            target: &SourceTarget,
        ) -> Result<Option<Observation>, ProviderError> {
            StatusSnafu {
                url: target.url.clone(),
                status: 503u16,
            }
            .fail()
        }
    }

    fn pick(up: bool) -> Box<dyn PriceProvider> {
        if up { Box::new(Fixed) } else { Box::new(Down) }
    }

    fn target() -> SourceTarget {
        SourceTarget {
            id: "CoinMarketCap-XRP".into(),
            target: "XRP".into(),
            kind: ProviderKind::CoinMarketCap,
            url: "https://example.invalid/xrp".into(),
            description: None,
        }
    }

    #[tokio::test]
    async fn dynamic_providers_report_value_or_explicit_failure() {
        let t = target();

        let obs = pick(true).fetch(&t).await.unwrap().unwrap();
        assert_eq!(obs.entity, "XRP");
        assert_eq!(obs.source, "CoinMarketCap-XRP");

        let err = pick(false).fetch(&t).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 503, .. }));
        assert_eq!(err.to_string(), "https://example.invalid/xrp answered with HTTP 503");
    }

    #[test]
    fn registry_builds_coinmarketcap() {
        assert!(build_provider(ProviderKind::CoinMarketCap).is_ok());
    }
}
