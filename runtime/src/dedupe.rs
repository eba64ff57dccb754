//! Cross-source duplicate removal and ranking.

use crate::listing::NormalizedListing;
use std::collections::HashSet;

/// Canonical key: lower-cased part number and name with all whitespace removed.
pub fn canonical_key(part_number: &str, name: &str) -> String {
    part_number
        .chars()
        .chain(name.chars())
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Keep the first listing for each canonical key, in input order.
///
/// Input order is source-iteration order, so the earliest source wins.
pub fn dedupe(listings: Vec<NormalizedListing>) -> Vec<NormalizedListing> {
    let mut seen = HashSet::with_capacity(listings.len());
    listings
        .into_iter()
        .filter(|l| seen.insert(canonical_key(&l.part_number, &l.name)))
        .collect()
}

/// Stable sort by confidence, highest first. Ties keep source order.
pub fn rank(listings: &mut [NormalizedListing]) {
    listings.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}
