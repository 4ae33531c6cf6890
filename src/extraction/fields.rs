//! Text-to-value parsers for individual product fields
//!
//! Every parser is total: text it cannot make sense of yields `None`, and the
//! caller substitutes the field's zero value.

use regex::Regex;
use std::sync::OnceLock;

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("decimal regex is valid"))
}

fn out_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*(?:out of|/)\s*\d+").expect("out-of regex is valid")
    })
}

fn ratings_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d,.]*)\s*(?:global\s+)?(?:ratings?|reviews?)")
            .expect("ratings regex is valid")
    })
}

fn catalog_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/(?:dp|gp/product|gp/aw/d)/([A-Z0-9]{10})").expect("catalog id regex is valid")
    })
}

/// Parses a displayed price such as `"$1,299.99"`
///
/// Thousands separators are stripped, then the first decimal-number token is
/// taken.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    decimal_re()
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses a star rating such as `"4.3 out of 5 stars"`
///
/// Bare numbers are accepted too. Values outside 0–5 are rejected.
pub fn parse_rating(text: &str) -> Option<f64> {
    let value: f64 = match out_of_re().captures(text) {
        Some(caps) => caps[1].parse().ok()?,
        None => decimal_re().find(text)?.as_str().parse().ok()?,
    };

    (0.0..=5.0).contains(&value).then_some(value)
}

/// Parses a review count such as `"12,345 ratings"`
///
/// Falls back to the first digit run when no ratings marker is present,
/// which covers bare counts like `"(1,024)"`.
pub fn parse_review_count(text: &str) -> Option<u64> {
    let raw = match ratings_re().captures(text) {
        Some(caps) => caps.get(1)?.as_str().to_string(),
        None => {
            let start = text.find(|c: char| c.is_ascii_digit())?;
            text[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
                .collect()
        }
    };

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Maps a currency symbol found in price text to its ISO code
pub fn detect_currency(text: &str) -> Option<&'static str> {
    const SYMBOLS: &[(&str, &str)] = &[
        ("US$", "USD"),
        ("CA$", "CAD"),
        ("A$", "AUD"),
        ("$", "USD"),
        ("€", "EUR"),
        ("£", "GBP"),
        ("¥", "JPY"),
        ("₹", "INR"),
    ];

    SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| *code)
}

/// Extracts the ten-character catalog id from a product URL
pub fn catalog_id_from_url(url: &str) -> Option<String> {
    catalog_id_re()
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Collapses runs of whitespace and trims the ends
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses whitespace in extracted element text
pub(crate) fn clean_text(text: &str) -> String {
    normalize_query(text)
}
