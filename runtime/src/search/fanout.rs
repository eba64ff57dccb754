//! Concurrent per-source retrieval for one query string.
//!
//! Every configured source is fetched at once through the shared
//! [`FetchStrategy`]. A failing source contributes nothing and is reported;
//! the rest are normalized, merged in source order, deduplicated, ranked,
//! and truncated.

use super::SearchBackend;
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::rendered_fetch::SharedBrowser;
use crate::acquisition::static_fetch::StaticFetcher;
use crate::acquisition::strategy::{FetchOutcome, FetchStrategy};
use crate::acquisition::{FetchKind, ListingFetcher};
use crate::catalog::SourceCatalog;
use crate::config::{RenderConfig, RuntimeConfig};
use crate::dedupe;
use crate::listing::{NormalizedListing, RawRecord};
use crate::normalizer;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// What one source contributed to a query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source_id: String,
    /// `static`, `rendered`, or `none`.
    #[serde(serialize_with = "strategy_name")]
    pub strategy: Option<FetchKind>,
    /// Raw records fetched, before merge and dedup.
    pub records: usize,
    pub error: Option<String>,
}

fn strategy_name<S: Serializer>(kind: &Option<FetchKind>, s: S) -> Result<S::Ok, S::Error> {
    match kind {
        Some(FetchKind::Static) => s.serialize_str("static"),
        Some(FetchKind::Rendered) => s.serialize_str("rendered"),
        None => s.serialize_str("none"),
    }
}

/// Searches every source in a catalog.
///
/// Searches built with [`CatalogSearch::sharing`] from clones of one
/// [`SharedBrowser`] share its browser process and session ceiling.
#[derive(Clone)]
pub struct CatalogSearch {
    catalog: Arc<SourceCatalog>,
    strategy: FetchStrategy,
    browser: Option<SharedBrowser>,
}

impl CatalogSearch {
    pub fn new(catalog: Arc<SourceCatalog>, strategy: FetchStrategy) -> Self {
        Self {
            catalog,
            strategy,
            browser: None,
        }
    }

    /// Static fetch first, then (when enabled) a Chromium browser of its own.
    pub fn from_config(catalog: Arc<SourceCatalog>, config: &RuntimeConfig) -> Result<Self> {
        let browser = config
            .render
            .enabled
            .then(|| SharedBrowser::chromium(&config.render));
        Self::sharing(catalog, config, browser)
    }

    /// Static fetch first, then (when enabled) the given browser.
    pub fn sharing(
        catalog: Arc<SourceCatalog>,
        config: &RuntimeConfig,
        browser: Option<SharedBrowser>,
    ) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        let primary: Arc<dyn ListingFetcher> = Arc::new(StaticFetcher::new(http));
        let browser = browser.filter(|_| config.render.enabled);
        if browser.is_none() {
            tracing::debug!("rendered fallback disabled");
        }
        Ok(Self::with_primary(catalog, primary, browser, &config.render))
    }

    fn with_primary(
        catalog: Arc<SourceCatalog>,
        primary: Arc<dyn ListingFetcher>,
        browser: Option<SharedBrowser>,
        render: &RenderConfig,
    ) -> Self {
        let fallback = browser.as_ref().map(|b| {
            let rendered: Arc<dyn ListingFetcher> = Arc::new(b.fetcher(render.clone()));
            rendered
        });
        Self {
            catalog,
            strategy: FetchStrategy::new(primary, fallback),
            browser,
        }
    }

    /// Merged listings plus a report per source, in catalog order.
    pub async fn search_with_report(
        &self,
        query: &str,
        limit: usize,
    ) -> (Vec<NormalizedListing>, Vec<SourceReport>) {
        let fetches = self.catalog.sources().iter().map(|source| async move {
            let result = self.strategy.get_listings_with_outcome(source, query, limit).await;
            (source.id.as_str(), result)
        });
        let settled = futures::future::join_all(fetches).await;

        let mut per_source: Vec<Vec<RawRecord>> = Vec::with_capacity(settled.len());
        let mut reports = Vec::with_capacity(settled.len());
        for (source_id, result) in settled {
            match result {
                Ok(FetchOutcome { records, strategy }) => {
                    reports.push(SourceReport {
                        source_id: source_id.to_string(),
                        strategy,
                        records: records.len(),
                        error: None,
                    });
                    per_source.push(records);
                }
                Err(e) => {
                    tracing::warn!("{source_id}: no listings for {query:?}: {e}");
                    reports.push(SourceReport {
                        source_id: source_id.to_string(),
                        strategy: None,
                        records: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        (merge(per_source, limit), reports)
    }

    /// Close the shared browser if it was launched.
    pub async fn shutdown(&self) -> Result<()> {
        match &self.browser {
            Some(b) => b.shutdown().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchBackend for CatalogSearch {
    async fn search(&self, query: &str, limit: usize) -> Vec<NormalizedListing> {
        self.search_with_report(query, limit).await.0
    }
}

/// Normalize, dedupe (first occurrence wins), rank, and truncate.
pub fn merge(per_source: Vec<Vec<RawRecord>>, limit: usize) -> Vec<NormalizedListing> {
    let normalized = per_source
        .into_iter()
        .flatten()
        .map(normalizer::normalize)
        .collect();
    let mut listings = dedupe::dedupe(normalized);
    dedupe::rank(&mut listings);
    listings.truncate(limit);
    listings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceProfile;
    use crate::errors::FetchError;
    use crate::pool::SessionLimiter;
    use crate::renderer::{LazyRenderer, NoopRenderer};

    fn raw(source: &str, pn: &str, name: &str, price: &str, url: &str) -> RawRecord {
        RawRecord {
            part_number: pn.into(),
            name: name.into(),
            price_text: price.into(),
            availability_text: "In stock".into(),
            product_url: url.into(),
            source_id: source.into(),
        }
    }

    #[test]
    fn test_merge_dedupes_across_sources() {
        let merged = merge(
            vec![
                vec![raw("a", "6203", "Bearing", "$4.00", "")],
                vec![
                    raw("b", "6203 ", "bearing", "$3.50", "https://b.example/6203"),
                    raw("b", "6204", "Bearing", "$5.00", "https://b.example/6204"),
                ],
            ],
            10,
        );
        assert_eq!(merged.len(), 2);
        // higher-confidence listing ranks first; the duplicate kept its first occurrence
        assert_eq!(merged[0].part_number, "6204");
        assert_eq!(merged[1].source_id, "a");
    }

    #[test]
    fn test_merge_truncates() {
        let records = (0..8)
            .map(|i| raw("a", &format!("P{i}"), "Belt", "$1", ""))
            .collect();
        assert_eq!(merge(vec![records], 5).len(), 5);
    }

    struct OnlyFrom(&'static str);

    #[async_trait]
    impl ListingFetcher for OnlyFrom {
        fn kind(&self) -> FetchKind {
            FetchKind::Static
        }

        async fn fetch(
            &self,
            source: &SourceProfile,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<RawRecord>, FetchError> {
            if source.id == self.0 {
                Ok(vec![raw(&source.id, "6203", "Ball Bearing", "$4", "")])
            } else {
                Err(FetchError::transport(&source.base_url, "HTTP 403"))
            }
        }
    }

    #[tokio::test]
    async fn test_failing_sources_are_isolated() {
        let catalog = Arc::new(SourceCatalog::builtin().unwrap());
        let search = CatalogSearch::new(
            Arc::clone(&catalog),
            FetchStrategy::new(Arc::new(OnlyFrom("zoro")), None),
        );

        let (listings, reports) = search.search_with_report("6203", 10).await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].source_id, "zoro");
        assert_eq!(reports.len(), catalog.len());

        let zoro = reports.iter().find(|r| r.source_id == "zoro").unwrap();
        assert_eq!(zoro.strategy, Some(FetchKind::Static));
        assert!(reports
            .iter()
            .filter(|r| r.source_id != "zoro")
            .all(|r| r.error.is_some() && r.strategy.is_none()));

        let json = serde_json::to_value(&reports[0]).unwrap();
        assert!(json.get("sourceId").is_some());
    }

    #[test]
    fn test_report_strategy_names() {
        let report = SourceReport {
            source_id: "motion".into(),
            strategy: None,
            records: 0,
            error: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "none");
    }

    #[test]
    fn test_from_config_without_browser() {
        let mut config = RuntimeConfig::default();
        config.render.enabled = false;
        let search =
            CatalogSearch::from_config(Arc::new(SourceCatalog::builtin().unwrap()), &config)
                .unwrap();
        assert!(search.browser.is_none());
    }

    #[tokio::test]
    async fn test_searches_share_one_browser_ceiling() {
        let catalog = Arc::new(SourceCatalog::builtin().unwrap());
        let browser = SharedBrowser::new(
            Arc::new(LazyRenderer::ready(Arc::new(NoopRenderer))),
            SessionLimiter::new(1),
        );
        let render = RenderConfig::default();
        let searches: Vec<CatalogSearch> = (0..2)
            .map(|_| {
                CatalogSearch::with_primary(
                    Arc::clone(&catalog),
                    Arc::new(OnlyFrom("none")),
                    Some(browser.clone()),
                    &render,
                )
            })
            .collect();

        let _held = browser.limiter().try_acquire().unwrap();
        for search in &searches {
            let (listings, reports) = search.search_with_report("6203", 10).await;
            assert!(listings.is_empty());
            assert!(reports.iter().all(|r| r
                .error
                .as_deref()
                .is_some_and(|e| e.contains("capacity exceeded"))));
        }
    }
}
