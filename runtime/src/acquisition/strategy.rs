//! Static-first fetch sequencing per source.

use super::{FetchKind, ListingFetcher};
use crate::catalog::SourceProfile;
use crate::errors::FetchError;
use crate::listing::RawRecord;
use std::sync::Arc;

/// Records from one source plus the path that produced them.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    /// `None` when no path produced records.
    pub strategy: Option<FetchKind>,
}

/// Runs the primary (static) fetcher and, only when it yields nothing, the
/// fallback (rendered) fetcher. The two never overlap for a source.
#[derive(Clone)]
pub struct FetchStrategy {
    primary: Arc<dyn ListingFetcher>,
    fallback: Option<Arc<dyn ListingFetcher>>,
}

impl FetchStrategy {
    pub fn new(primary: Arc<dyn ListingFetcher>, fallback: Option<Arc<dyn ListingFetcher>>) -> Self {
        Self { primary, fallback }
    }

    /// Raw records for `query` from `source`.
    pub async fn get_listings(
        &self,
        source: &SourceProfile,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        self.get_listings_with_outcome(source, query, max_results)
            .await
            .map(|o| o.records)
    }

    /// Like [`get_listings`](Self::get_listings), also reporting which path succeeded.
    ///
    /// A primary transport failure counts as "no records" and moves on to
    /// the fallback. When both fail, the fallback's error is returned; with no
    /// fallback configured, the primary's.
    pub async fn get_listings_with_outcome(
        &self,
        source: &SourceProfile,
        query: &str,
        max_results: usize,
    ) -> Result<FetchOutcome, FetchError> {
        let primary_error = match self.primary.fetch(source, query, max_results).await {
            Ok(records) if !records.is_empty() => {
                return Ok(FetchOutcome {
                    records,
                    strategy: Some(self.primary.kind()),
                });
            }
            Ok(_) => {
                tracing::debug!("{}: {} fetch found nothing", source.id, self.primary.kind());
                None
            }
            Err(e) => {
                tracing::debug!("{}: {} fetch failed: {e}", source.id, self.primary.kind());
                Some(e)
            }
        };

        let Some(fallback) = &self.fallback else {
            return match primary_error {
                Some(e) => Err(e),
                None => Ok(FetchOutcome::default()),
            };
        };

        tracing::info!("{}: falling back to {} fetch", source.id, fallback.kind());
        let records = fallback.fetch(source, query, max_results).await?;
        let strategy = (!records.is_empty()).then(|| fallback.kind());
        Ok(FetchOutcome { records, strategy })
    }
}
