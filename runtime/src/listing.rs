//! Record types flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One listing as scraped from a page, before normalization.
///
/// Produced per fetch attempt and discarded afterwards. Only records with a
/// part number, a name, and price text are promoted to listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub part_number: String,
    pub name: String,
    pub price_text: String,
    pub availability_text: String,
    pub product_url: String,
    pub source_id: String,
}

impl RawRecord {
    /// Whether the record carries enough to become a listing.
    pub fn is_complete(&self) -> bool {
        !self.part_number.trim().is_empty()
            && !self.name.trim().is_empty()
            && !self.price_text.trim().is_empty()
    }
}

/// Stock classification of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    InStock,
    OutOfStock,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::InStock)
    }
}

/// Final output unit: one normalized listing from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedListing {
    pub part_number: String,
    pub name: String,
    /// Parsed numeric price; `None` when the text held no recognizable price.
    pub numeric_price: Option<f64>,
    pub price_text: String,
    pub availability: Availability,
    pub source_id: String,
    /// Empty when the source exposed no product link.
    pub product_url: String,
    /// Heuristic quality estimate in `[0.0, 1.0]`.
    pub confidence: f32,
    pub retrieved_at: DateTime<Utc>,
}
