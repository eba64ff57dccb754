//! Query enhancement: rule-based heuristics escalating to a language model.
//!
//! [`QueryEnhancer::enhance`] never fails. A confident rule short-circuits;
//! otherwise the model is consulted when credentials exist; every model
//! failure degrades to an `errorFallback` enhancement carrying the original
//! query.

pub mod llm;
pub mod rules;

use crate::config::LlmConfig;
use llm::{ChatCompletionClient, CompletionClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Confidence reported when no enhancement path applies.
pub const PASSTHROUGH_CONFIDENCE: f32 = 0.3;
/// Confidence reported when the model call failed.
pub const ERROR_FALLBACK_CONFIDENCE: f32 = 0.2;

/// Which path produced an enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnhancementMethod {
    RuleBased,
    Llm,
    LlmFallback,
    Passthrough,
    ErrorFallback,
}

impl EnhancementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleBased => "ruleBased",
            Self::Llm => "llm",
            Self::LlmFallback => "llmFallback",
            Self::Passthrough => "passthrough",
            Self::ErrorFallback => "errorFallback",
        }
    }
}

impl std::fmt::Display for EnhancementMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An improved query plus ordered alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEnhancement {
    pub original_query: String,
    pub enhanced_query: String,
    pub suggestions: Vec<String>,
    pub confidence: f32,
    pub method: EnhancementMethod,
}

impl QueryEnhancement {
    fn unchanged(query: &str, confidence: f32, method: EnhancementMethod) -> Self {
        Self {
            original_query: query.to_string(),
            enhanced_query: query.to_string(),
            suggestions: Vec::new(),
            confidence,
            method,
        }
    }
}

/// Rewrites low-quality search terms into catalog vocabulary.
#[derive(Clone, Default)]
pub struct QueryEnhancer {
    llm: Option<Arc<dyn CompletionClient>>,
}

impl QueryEnhancer {
    /// Rule-based only.
    pub fn rules_only() -> Self {
        Self { llm: None }
    }

    /// With a model client for queries the rules miss.
    pub fn with_llm(client: Arc<dyn CompletionClient>) -> Self {
        Self { llm: Some(client) }
    }

    /// Uses the chat-completion endpoint when credentials are configured.
    pub fn from_config(config: &LlmConfig) -> Self {
        if !config.has_credentials() {
            return Self::rules_only();
        }
        match ChatCompletionClient::new(config) {
            Ok(client) => Self::with_llm(Arc::new(client)),
            Err(e) => {
                tracing::warn!("language-model enhancement disabled: {e}");
                Self::rules_only()
            }
        }
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn enhance(&self, query: &str) -> QueryEnhancement {
        let query = query.trim();

        if let Some(m) = rules::apply(query) {
            tracing::debug!(
                "rule '{}' rewrote {query:?} to {:?} ({:.2})",
                m.rule,
                m.enhanced_query,
                m.confidence
            );
            return QueryEnhancement {
                original_query: query.to_string(),
                enhanced_query: m.enhanced_query,
                suggestions: m.suggestions,
                confidence: m.confidence,
                method: EnhancementMethod::RuleBased,
            };
        }

        let Some(client) = &self.llm else {
            return QueryEnhancement::unchanged(
                query,
                PASSTHROUGH_CONFIDENCE,
                EnhancementMethod::Passthrough,
            );
        };

        let reply = client
            .complete(llm::SYSTEM_PROMPT, &llm::user_prompt(query))
            .await
            .and_then(|text| llm::decode_reply(&text));

        match reply {
            Ok(s) => {
                let method = if s.structured {
                    EnhancementMethod::Llm
                } else {
                    EnhancementMethod::LlmFallback
                };
                tracing::debug!("model rewrote {query:?} to {:?} ({method})", s.enhanced_query);
                QueryEnhancement {
                    original_query: query.to_string(),
                    enhanced_query: s.enhanced_query,
                    suggestions: s.alternatives,
                    confidence: s.confidence,
                    method,
                }
            }
            Err(e) => {
                tracing::warn!("query enhancement failed, using original query: {e}");
                QueryEnhancement::unchanged(
                    query,
                    ERROR_FALLBACK_CONFIDENCE,
                    EnhancementMethod::ErrorFallback,
                )
            }
        }
    }
}
