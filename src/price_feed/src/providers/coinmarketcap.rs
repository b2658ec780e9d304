//! CoinMarketCap currency pages (`https://coinmarketcap.com/currencies/<slug>/`).

pub mod extract;
pub mod provider;
