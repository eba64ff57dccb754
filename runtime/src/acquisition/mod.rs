//! Listing acquisition: static HTTP parsing with a rendered-browser fallback.
//!
//! Each source is fetched static-first. The browser path only runs when the
//! static path produced no records, and the two never run concurrently for
//! the same source.

pub mod extractor;
pub mod http_client;
pub mod page_script;
pub mod rendered_fetch;
pub mod static_fetch;
pub mod strategy;

use crate::catalog::SourceProfile;
use crate::errors::FetchError;
use crate::listing::RawRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which fetch path produced (or failed to produce) records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Static,
    Rendered,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Static => f.write_str("static"),
            FetchKind::Rendered => f.write_str("rendered"),
        }
    }
}

/// One way of turning a query into raw records for a source.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    fn kind(&self) -> FetchKind;

    /// Fetch at most `max_results` complete records. Zero matches is `Ok(vec![])`.
    async fn fetch(
        &self,
        source: &SourceProfile,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RawRecord>, FetchError>;
}
