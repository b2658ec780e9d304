use serde::{Deserialize, Serialize};

/// Which acquisition strategy handles a configured source (serde snake_case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// CoinMarketCap currency page; the price is read from the rendered HTML.
    #[serde(rename = "coinmarketcap")]
    CoinMarketCap,
}

/// One configured `{source_identifier, display_target}` pair plus how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceTarget {
    /// Source identifier stored with every observation (e.g. "CoinMarketCap-ETH").
    pub id: String,
    /// Entity the source reports on (e.g. "Ethereum").
    pub target: String,
    /// Acquisition strategy.
    pub kind: ProviderKind,
    /// Page or endpoint to fetch.
    pub url: String,
    /// Free-form description, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
