//! `partscout search <query>`: run the full retrieval cascade.

use crate::catalog::SourceCatalog;
use crate::cli::output;
use crate::config::RuntimeConfig;
use crate::enhance::QueryEnhancer;
use crate::listing::NormalizedListing;
use crate::search::fanout::{CatalogSearch, SourceReport};
use crate::search::{SearchBackend, SearchOrchestrator, SmartSearchOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Keeps the per-source report of the most recent query.
struct Recording<'a> {
    inner: &'a CatalogSearch,
    last: Mutex<Vec<SourceReport>>,
}

#[async_trait]
impl SearchBackend for Recording<'_> {
    async fn search(&self, query: &str, limit: usize) -> Vec<NormalizedListing> {
        let (listings, reports) = self.inner.search_with_report(query, limit).await;
        if let Ok(mut last) = self.last.lock() {
            *last = reports;
        }
        listings
    }
}

/// Run the search command.
pub async fn run(
    query: &str,
    limit: Option<usize>,
    no_browser: bool,
    report: bool,
    sources: &[String],
) -> Result<()> {
    let mut config = RuntimeConfig::from_env();
    if no_browser {
        config.render.enabled = false;
    }
    let limit = limit.unwrap_or(config.search.default_limit);

    let mut catalog = SourceCatalog::builtin().context("failed to load source catalog")?;
    if !sources.is_empty() {
        catalog = catalog.restricted_to(sources)?;
    }
    let catalog = Arc::new(catalog);
    let backend = CatalogSearch::from_config(catalog, &config)?;
    let orchestrator = SearchOrchestrator::new(
        QueryEnhancer::from_config(&config.llm),
        config.search.clone(),
    );

    let recording = Recording {
        inner: &backend,
        last: Mutex::new(Vec::new()),
    };
    let outcome = orchestrator.smart_search(query, limit, &recording).await;

    if let Err(e) = backend.shutdown().await {
        tracing::debug!("browser shutdown failed: {e:#}");
    }
    let outcome = outcome?;
    let reports = recording.last.into_inner().unwrap_or_default();

    if output::is_json() {
        let mut value = serde_json::to_value(&outcome)?;
        if report {
            value["sources"] = serde_json::to_value(&reports)?;
        }
        output::print_json(&value);
        return Ok(());
    }

    print_outcome(&outcome);
    if report {
        print_reports(&reports);
    }
    Ok(())
}

fn print_outcome(outcome: &SmartSearchOutcome) {
    if outcome.results.is_empty() {
        if !output::is_quiet() {
            eprintln!(
                "  No listings found for '{}'. Try a part number or a broader term.",
                outcome.original_query
            );
        }
        return;
    }

    if !output::is_quiet() {
        eprintln!(
            "  {} listing(s) for '{}' (via {}, confidence {:.2})",
            outcome.results.len(),
            outcome.query,
            outcome.method,
            outcome.confidence
        );
        eprintln!();
    }

    for l in &outcome.results {
        let price = l
            .numeric_price
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| output::truncate(&l.price_text, 10));
        let stock = if l.availability.is_available() {
            "in stock"
        } else {
            "out"
        };
        println!(
            "  {:<10} {:<16} {:<40} {:>10} {:<8} {:.2}  {}",
            l.source_id,
            output::truncate(&l.part_number, 16),
            output::truncate(&l.name, 40),
            price,
            stock,
            l.confidence,
            l.product_url,
        );
    }
}

fn print_reports(reports: &[SourceReport]) {
    eprintln!();
    for r in reports {
        let strategy = r
            .strategy
            .map(|k| k.to_string())
            .unwrap_or_else(|| "none".to_string());
        match &r.error {
            Some(e) => eprintln!("  [!!] {:<10} {e}", r.source_id),
            None => eprintln!(
                "  [OK] {:<10} {:>3} record(s) via {strategy}",
                r.source_id, r.records
            ),
        }
    }
}
