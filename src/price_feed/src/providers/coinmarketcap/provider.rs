use async_trait::async_trait;
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, header};
use shared_utils::env::env_var_or;
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::{
    models::{observation::Observation, source_target::SourceTarget},
    providers::{
        ClientBuildSnafu, ExtractionSnafu, ParseSnafu, PriceProvider, ProviderError,
        ProviderInitError, ReqwestSnafu, StatusSnafu,
        coinmarketcap::extract::{PriceText, find_price_text, parse_price_text},
    },
};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Env override for the `User-Agent` header.
pub const USER_AGENT_ENV: &str = "PRICE_FEED_USER_AGENT";

pub struct CoinMarketCapProvider {
    client: Client,
    limiter: DefaultDirectRateLimiter,
}

impl CoinMarketCapProvider {
    /// Creates a provider allowing at most 30 page fetches per minute.
    ///
    /// The `User-Agent` defaults to a desktop browser string and can be replaced
    /// through the `PRICE_FEED_USER_AGENT` environment variable.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_quota(Quota::per_minute(nonzero!(30u32)))
    }

    /// Creates a provider with a custom fetch quota.
    pub fn with_quota(quota: Quota) -> Result<Self, ProviderInitError> {
        let user_agent = env_var_or(USER_AGENT_ENV, DEFAULT_USER_AGENT);

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(header::ACCEPT, header::HeaderValue::from_static("text/html"));
                headers
            })
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            limiter: RateLimiter::direct(quota),
        })
    }
}

#[async_trait]
impl PriceProvider for CoinMarketCapProvider {
    async fn fetch(&self, target: &SourceTarget) -> Result<Option<Observation>, ProviderError> {
        self.limiter.until_ready().await;

        let url = target.url.as_str();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(ReqwestSnafu { url })?;

        let status = response.status();
        if !status.is_success() {
            return StatusSnafu {
                url,
                status: status.as_u16(),
            }
            .fail();
        }

        let body = response.text().await.context(ReqwestSnafu { url })?;

        match find_price_text(&body).context(ExtractionSnafu { url })? {
            PriceText::Unavailable => {
                debug!(source = %target.id, "price display shows a placeholder");
                Ok(None)
            }
            PriceText::Value(raw) => {
                let price = parse_price_text(raw).context(ParseSnafu { raw })?;
                Ok(Some(Observation::new(
                    &target.target,
                    price,
                    &target.id,
                    Utc::now(),
                )))
            }
        }
    }
}
