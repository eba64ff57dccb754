//! Cascading search: enhanced query, then suggestions, then the original.
//!
//! Each stage runs only when every earlier stage produced zero listings.
//! An empty final result is a normal outcome, never an error.

pub mod fanout;

use crate::config::SearchConfig;
use crate::enhance::{EnhancementMethod, QueryEnhancer};
use crate::errors::SearchError;
use crate::listing::NormalizedListing;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::Instrument;

/// Confidence reported when a suggestion stage produced the results.
pub const SUGGESTION_CONFIDENCE: f32 = 0.6;
/// Confidence reported for the original-query stage.
pub const ORIGINAL_CONFIDENCE: f32 = 0.5;

/// Runs one query string against every source and returns merged listings.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Vec<NormalizedListing>;
}

/// Which cascade stage produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchMethod {
    RuleBased,
    Llm,
    LlmFallback,
    Passthrough,
    ErrorFallback,
    Suggestion,
    Original,
}

impl From<EnhancementMethod> for SearchMethod {
    fn from(m: EnhancementMethod) -> Self {
        match m {
            EnhancementMethod::RuleBased => Self::RuleBased,
            EnhancementMethod::Llm => Self::Llm,
            EnhancementMethod::LlmFallback => Self::LlmFallback,
            EnhancementMethod::Passthrough => Self::Passthrough,
            EnhancementMethod::ErrorFallback => Self::ErrorFallback,
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RuleBased => "ruleBased",
            Self::Llm => "llm",
            Self::LlmFallback => "llmFallback",
            Self::Passthrough => "passthrough",
            Self::ErrorFallback => "errorFallback",
            Self::Suggestion => "suggestion",
            Self::Original => "original",
        };
        f.write_str(s)
    }
}

/// Listings plus the query that found them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartSearchOutcome {
    pub results: Vec<NormalizedListing>,
    /// The query string that produced `results`.
    pub query: String,
    pub original_query: String,
    pub method: SearchMethod,
    pub confidence: f32,
}

struct Stage {
    query: String,
    method: SearchMethod,
    confidence: f32,
}

/// Enhances a query and retries retrieval with progressively safer queries.
#[derive(Clone)]
pub struct SearchOrchestrator {
    enhancer: QueryEnhancer,
    config: SearchConfig,
}

impl SearchOrchestrator {
    pub fn new(enhancer: QueryEnhancer, config: SearchConfig) -> Self {
        Self { enhancer, config }
    }

    /// Check the input contract before any source is touched.
    pub fn validate(&self, query: &str, limit: usize) -> Result<(), SearchError> {
        if query.trim().chars().count() < self.config.min_query_len {
            return Err(SearchError::QueryTooShort {
                min: self.config.min_query_len,
            });
        }
        if limit == 0 || limit > self.config.max_limit {
            return Err(SearchError::InvalidLimit {
                got: limit,
                max: self.config.max_limit,
            });
        }
        Ok(())
    }

    pub async fn smart_search(
        &self,
        query: &str,
        limit: usize,
        backend: &dyn SearchBackend,
    ) -> Result<SmartSearchOutcome, SearchError> {
        self.validate(query, limit)?;
        let original = query.trim().to_string();

        let span = tracing::info_span!(
            "smart_search",
            search_id = %uuid::Uuid::new_v4(),
            query = %original
        );
        let outcome = self.run_cascade(original, limit, backend).instrument(span).await;
        Ok(outcome)
    }

    async fn run_cascade(
        &self,
        original: String,
        limit: usize,
        backend: &dyn SearchBackend,
    ) -> SmartSearchOutcome {
        let enhancement = self.enhancer.enhance(&original).await;
        tracing::info!(
            "enhanced to {:?} via {} ({:.2})",
            enhancement.enhanced_query,
            enhancement.method,
            enhancement.confidence
        );

        let mut stages = vec![Stage {
            query: enhancement.enhanced_query.clone(),
            method: enhancement.method.into(),
            confidence: enhancement.confidence,
        }];
        stages.extend(
            enhancement
                .suggestions
                .iter()
                .take(self.config.max_suggestions)
                .map(|s| Stage {
                    query: s.clone(),
                    method: SearchMethod::Suggestion,
                    confidence: SUGGESTION_CONFIDENCE,
                }),
        );
        stages.push(Stage {
            query: original.clone(),
            method: SearchMethod::Original,
            confidence: ORIGINAL_CONFIDENCE,
        });

        let mut tried = HashSet::new();
        for stage in stages {
            if stage.query.trim().is_empty() || !tried.insert(query_key(&stage.query)) {
                continue;
            }

            let results = backend.search(&stage.query, limit).await;
            if !results.is_empty() {
                tracing::info!(
                    "{} listings for {:?} ({})",
                    results.len(),
                    stage.query,
                    stage.method
                );
                return SmartSearchOutcome {
                    results,
                    query: stage.query,
                    original_query: original,
                    method: stage.method,
                    confidence: stage.confidence,
                };
            }
            tracing::info!("no listings for {:?} ({}), moving on", stage.query, stage.method);
        }

        tracing::info!("no listings for any query variant");
        SmartSearchOutcome {
            results: Vec::new(),
            query: original.clone(),
            original_query: original,
            method: SearchMethod::Original,
            confidence: ORIGINAL_CONFIDENCE,
        }
    }
}

/// Case-insensitive, whitespace-collapsed identity of a query string.
fn query_key(q: &str) -> String {
    q.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
