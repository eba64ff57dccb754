//! Headless-browser fetch for sources whose listings only exist after
//! client-side rendering.
//!
//! Each fetch holds one [`SessionToken`](crate::pool::SessionToken) for its
//! whole lifetime and opens one short-lived page on the [`SharedBrowser`]:
//!
//! 1. randomize the viewport and block non-essential resources
//! 2. wait a small random delay, then navigate (with fixed-backoff retries)
//! 3. wait for the first container candidate to appear, in order
//! 4. run the listing script and decode its records
//!
//! The page is closed on every exit path, including budget timeouts. The
//! overall budget is the sum of the step timeouts plus slack, so it only
//! fires when a step ignores its own timeout.

use super::extractor::resolve_url;
use super::page_script;
use super::{FetchKind, ListingFetcher};
use crate::catalog::{Field, SourceProfile};
use crate::config::RenderConfig;
use crate::errors::FetchError;
use crate::listing::RawRecord;
use crate::pool::SessionLimiter;
use crate::renderer::{LazyRenderer, RenderContext, ResourceKind};
use crate::stealth;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The process-wide browser and its session ceiling.
///
/// Clones share one lazily launched browser and one [`SessionLimiter`], so
/// every fetcher built from them counts against the same ceiling.
#[derive(Clone)]
pub struct SharedBrowser {
    renderer: Arc<LazyRenderer>,
    limiter: SessionLimiter,
}

impl SharedBrowser {
    pub fn new(renderer: Arc<LazyRenderer>, limiter: SessionLimiter) -> Self {
        Self { renderer, limiter }
    }

    /// Headless Chromium, launched on the first rendered fetch.
    pub fn chromium(config: &RenderConfig) -> Self {
        Self::new(
            Arc::new(LazyRenderer::chromium(config.chromium_path.clone())),
            SessionLimiter::new(config.max_sessions),
        )
    }

    pub fn limiter(&self) -> &SessionLimiter {
        &self.limiter
    }

    pub fn fetcher(&self, config: RenderConfig) -> RenderedFetcher {
        RenderedFetcher {
            browser: self.clone(),
            config,
        }
    }

    /// Close the browser if it was launched.
    pub async fn shutdown(&self) -> Result<()> {
        self.renderer.shutdown().await
    }
}

/// Fetches listings by rendering the search page in the shared browser.
#[derive(Clone)]
pub struct RenderedFetcher {
    browser: SharedBrowser,
    config: RenderConfig,
}

impl RenderedFetcher {
    async fn open_and_drive(
        &self,
        source: &SourceProfile,
        url: &str,
        max_results: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let renderer = self
            .browser
            .renderer
            .get()
            .await
            .map_err(|e| FetchError::Navigation(format!("browser unavailable: {e:#}")))?;
        let mut ctx = renderer
            .new_context()
            .await
            .map_err(|e| FetchError::Navigation(format!("failed to open page: {e:#}")))?;

        let budget = self
            .config
            .fetch_budget(source.selectors(Field::Container).len());
        let outcome =
            tokio::time::timeout(budget, self.drive(ctx.as_mut(), source, url, max_results)).await;

        if let Err(e) = ctx.close().await {
            tracing::debug!("{}: page close failed: {e:#}", source.id);
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(FetchError::Navigation(format!(
                "rendered fetch exceeded {}ms budget",
                budget.as_millis()
            ))),
        }
    }

    async fn drive(
        &self,
        ctx: &mut dyn RenderContext,
        source: &SourceProfile,
        url: &str,
        max_results: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let viewport = stealth::random_viewport();
        if let Err(e) = ctx.set_viewport(viewport.width, viewport.height).await {
            tracing::debug!("{}: viewport override failed: {e:#}", source.id);
        }
        if let Err(e) = ctx.block_resources(&ResourceKind::NON_ESSENTIAL).await {
            tracing::debug!("{}: resource blocking unavailable: {e:#}", source.id);
        }

        tokio::time::sleep(stealth::jitter(self.config.pre_navigation_delay_ms())).await;

        self.navigate_with_retries(ctx, source, url).await?;
        let winner = self.wait_for_container(ctx, source).await?;
        tracing::debug!("{}: container candidate #{winner} appeared", source.id);

        let script = page_script::listing_script(source, max_results);
        let value = ctx
            .execute_js(&script)
            .await
            .map_err(|e| FetchError::Navigation(format!("listing script failed: {e:#}")))?;

        Ok(decode_records(value, source, max_results))
    }

    async fn navigate_with_retries(
        &self,
        ctx: &mut dyn RenderContext,
        source: &SourceProfile,
        url: &str,
    ) -> Result<(), FetchError> {
        let attempts = self.config.navigation_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match ctx.navigate(url, self.config.navigation_timeout_ms).await {
                Ok(nav) => {
                    tracing::debug!(
                        "{}: navigated to {} in {}ms (attempt {attempt})",
                        source.id,
                        nav.final_url,
                        nav.load_time_ms
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("{}: navigation attempt {attempt} failed: {e:#}", source.id);
                    last_error = format!("{e:#}");
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms))
                            .await;
                    }
                }
            }
        }

        Err(FetchError::Navigation(format!(
            "{url} after {attempts} attempts: {last_error}"
        )))
    }

    /// Index of the first container candidate that shows up within its budget.
    async fn wait_for_container(
        &self,
        ctx: &mut dyn RenderContext,
        source: &SourceProfile,
    ) -> Result<usize, FetchError> {
        let per_selector = Duration::from_millis(self.config.selector_timeout_ms);
        let poll = Duration::from_millis(self.config.selector_poll_ms.max(1));

        for (idx, candidate) in source.selectors(Field::Container).iter().enumerate() {
            let probe = page_script::probe_script(&candidate.css);
            let deadline = Instant::now() + per_selector;
            loop {
                let present = ctx.execute_js(&probe).await.map_err(|e| {
                    FetchError::Navigation(format!("page stopped responding: {e:#}"))
                })?;
                if present.as_bool().unwrap_or(false) {
                    return Ok(idx);
                }
                if Instant::now() + poll > deadline {
                    break;
                }
                tokio::time::sleep(poll).await;
            }
            tracing::debug!("{}: container {:?} never appeared", source.id, candidate.css);
        }

        Err(FetchError::NoContainerFound {
            source_id: source.id.clone(),
        })
    }
}

/// Turn the listing script's output into complete, source-tagged records.
fn decode_records(
    value: serde_json::Value,
    source: &SourceProfile,
    max_results: usize,
) -> Vec<RawRecord> {
    let records: Vec<RawRecord> = match serde_json::from_value(value) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("{}: listing script returned unexpected shape: {e}", source.id);
            return Vec::new();
        }
    };

    records
        .into_iter()
        .map(|mut rec| {
            rec.source_id = source.id.clone();
            rec.product_url = resolve_url(&source.base_url, &rec.product_url);
            rec
        })
        .filter(RawRecord::is_complete)
        .take(max_results)
        .collect()
}

#[async_trait]
impl ListingFetcher for RenderedFetcher {
    fn kind(&self) -> FetchKind {
        FetchKind::Rendered
    }

    async fn fetch(
        &self,
        source: &SourceProfile,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let url = source.search_url(query);
        let records = self
            .browser
            .limiter
            .run(async {
                tracing::debug!("{}: rendered fetch of {url}", source.id);
                self.open_and_drive(source, &url, max_results).await
            })
            .await?;
        tracing::debug!("{}: rendered fetch found {} records", source.id, records.len());
        Ok(records)
    }
}
