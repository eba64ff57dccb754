//! Error taxonomy for the retrieval pipeline.
//!
//! Fetch errors are caught at the per-source boundary and degrade that
//! source to an empty contribution. Enhancement errors degrade the query
//! stage to a fallback enhancement. Only [`SearchError`] reaches the caller
//! of a search, and only for input-contract violations.

use thiserror::Error;

/// Failure of a single fetch attempt against one source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Static fetch network, timeout, or HTTP status failure.
    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Rendered fetch could not navigate after all retries.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// No candidate container selector appeared within its budget.
    #[error("no container selector matched for source '{source_id}'")]
    NoContainerFound { source_id: String },

    /// The rendered-session ceiling is reached.
    #[error("rendered session capacity exceeded ({limit} active)")]
    CapacityExceeded { limit: usize },
}

impl FetchError {
    pub(crate) fn transport(url: &str, reason: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of the external language-model enhancement call.
#[derive(Debug, Error)]
pub enum EnhancementError {
    /// No API key is configured.
    #[error("no language-model credentials configured")]
    MissingCredentials,

    /// Network failure or timeout.
    #[error("completion request failed: {0}")]
    Request(String),

    /// Non-2xx response.
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not a usable completion.
    #[error("malformed completion response: {0}")]
    Decode(String),
}

/// Input-contract violations that prevent any source from being attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("query must be at least {min} characters")]
    QueryTooShort { min: usize },

    #[error("result limit must be between 1 and {max}, got {got}")]
    InvalidLimit { got: usize, max: usize },
}
