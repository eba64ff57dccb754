//! Raw record normalization: price parsing, availability classification,
//! and confidence scoring.
//!
//! # Confidence model
//!
//! Every listing starts at 0.5. A parsed price adds 0.3, a part number
//! longer than three characters adds 0.1, and a product URL adds 0.1. The
//! total is capped at 1.0.

use crate::listing::{Availability, NormalizedListing, RawRecord};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

const BASE_CONFIDENCE: f32 = 0.5;
const PRICE_BONUS: f32 = 0.3;
const PART_NUMBER_BONUS: f32 = 0.1;
const URL_BONUS: f32 = 0.1;

/// Phrases marking a listing as unavailable (matched case-insensitively).
const UNAVAILABLE_PHRASES: &[&str] = &[
    "out of stock",
    "discontinued",
    "unavailable",
    "backordered",
    "special order",
    "not available",
];

/// `$1,234.56`, `€ 12`, `£3.50`
static CURRENCY_PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$\u{20AC}\u{00A3}]\s*(\d[\d,]*(?:\.\d+)?)").expect("prefixed price regex is valid")
});

/// `123.45 USD`, `1,234.56 dollars`
static CURRENCY_SUFFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:USD|CAD|EUR|GBP|dollars?)\b")
        .expect("suffixed price regex is valid")
});

/// `Price: 99`, `price 12.50`
static LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)price\s*:?\s*[$\u{20AC}\u{00A3}]?\s*(\d[\d,]*(?:\.\d+)?)")
        .expect("labeled price regex is valid")
});

/// Parse a numeric price out of free text.
///
/// Patterns are tried in order (currency-prefixed, currency-suffixed word
/// form, labeled) and the first match wins. Thousands separators are
/// stripped before parsing. Returns `None` when no pattern matches or the
/// value is not a positive finite number.
pub fn parse_price(text: &str) -> Option<f64> {
    [&*CURRENCY_PREFIXED, &*CURRENCY_SUFFIXED, &*LABELED]
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Classify availability text.
///
/// Empty text means available: sources commonly omit the stock badge for
/// stocked items. Anything containing a deny-list phrase is unavailable;
/// everything else is available.
pub fn classify_availability(text: &str) -> Availability {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return Availability::InStock;
    }
    if UNAVAILABLE_PHRASES.iter().any(|p| lower.contains(p)) {
        Availability::OutOfStock
    } else {
        Availability::InStock
    }
}

/// Confidence score for a listing, in `[0.0, 1.0]`.
pub fn score(has_price: bool, part_number: &str, product_url: &str) -> f32 {
    let mut confidence = BASE_CONFIDENCE;
    if has_price {
        confidence += PRICE_BONUS;
    }
    if part_number.trim().chars().count() > 3 {
        confidence += PART_NUMBER_BONUS;
    }
    if !product_url.trim().is_empty() {
        confidence += URL_BONUS;
    }
    confidence.clamp(0.0, 1.0)
}

/// Normalize a raw record, stamping it with the current time.
pub fn normalize(record: RawRecord) -> NormalizedListing {
    normalize_at(record, Utc::now())
}

/// Normalize a raw record with an explicit retrieval time.
pub fn normalize_at(record: RawRecord, retrieved_at: DateTime<Utc>) -> NormalizedListing {
    let numeric_price = parse_price(&record.price_text);
    let availability = classify_availability(&record.availability_text);
    let confidence = score(
        numeric_price.is_some(),
        &record.part_number,
        &record.product_url,
    );

    NormalizedListing {
        part_number: record.part_number.trim().to_string(),
        name: record.name.trim().to_string(),
        numeric_price,
        price_text: record.price_text.trim().to_string(),
        availability,
        source_id: record.source_id,
        product_url: record.product_url.trim().to_string(),
        confidence,
        retrieved_at,
    }
}
