//! Pulls the displayed price out of a CoinMarketCap currency page.

use std::sync::LazyLock;

use regex::Regex;

/// Matches the first text inside the element tagged `data-test="text-cdp-price-display"`,
/// skipping any opening tags nested in front of it.
static PRICE_DISPLAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-test\s*=\s*"text-cdp-price-display"[^>]*>(?:\s*<[^/>][^>]*>)*\s*([^<]*?)\s*<"#)
        .expect("price display pattern is valid")
});

/// Placeholders the page shows when no quote is available.
const PLACEHOLDERS: &[&str] = &["--", "-", "N/A", "n/a"];

/// What the price element contained.
#[derive(Debug, PartialEq)]
pub enum PriceText<'a> {
    /// A candidate price string, still to be parsed.
    Value(&'a str),
    /// The element exists but shows a placeholder.
    Unavailable,
}

/// Locates the price display element; `None` if the page has no such element or it
/// holds no text at all.
pub fn find_price_text(html: &str) -> Option<PriceText<'_>> {
    let caps = PRICE_DISPLAY.captures(html)?;
    let raw = caps.get(1)?.as_str().trim();
    if raw.is_empty() {
        return None;
    }
    if PLACEHOLDERS.contains(&raw) {
        Some(PriceText::Unavailable)
    } else {
        Some(PriceText::Value(raw))
    }
}

/// Parses display text such as `"$65,432.10"` into a number.
pub fn parse_price_text(raw: &str) -> Result<f64, std::num::ParseFloatError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect();
    cleaned.parse::<f64>()
}
