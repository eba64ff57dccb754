//! Runtime configuration.
//!
//! Every value has a default; [`RuntimeConfig::from_env`] overlays
//! `PARTSCOUT_*` environment variables on top of them.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration for the retrieval pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub http: HttpConfig,
    pub render: RenderConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
}

/// Static fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_redirects: 5,
        }
    }
}

/// Rendered (headless browser) fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// When false, sources never fall back to the browser.
    pub enabled: bool,
    /// Hard ceiling on concurrent rendered fetches.
    pub max_sessions: usize,
    pub navigation_timeout_ms: u64,
    /// Retries after the first failed navigation.
    pub navigation_retries: u32,
    pub retry_backoff_ms: u64,
    /// Budget for each container candidate to appear.
    pub selector_timeout_ms: u64,
    pub selector_poll_ms: u64,
    pub pre_navigation_delay_min_ms: u64,
    pub pre_navigation_delay_max_ms: u64,
    /// Headroom on top of the summed step timeouts for opening the page
    /// and running the listing script.
    pub fetch_slack_ms: u64,
    pub chromium_path: Option<String>,
}

impl RenderConfig {
    pub fn pre_navigation_delay_ms(&self) -> RangeInclusive<u64> {
        let lo = self.pre_navigation_delay_min_ms;
        lo..=self.pre_navigation_delay_max_ms.max(lo)
    }

    /// Overall budget for one rendered fetch, page close excluded.
    ///
    /// Covers the longest pre-navigation delay, every navigation attempt at
    /// its full timeout with backoff in between, and the full wait on each
    /// of `container_candidates`, so the outer timeout never cuts a retry
    /// or a container wait short.
    pub fn fetch_budget(&self, container_candidates: usize) -> Duration {
        let retries = u64::from(self.navigation_retries);
        let ms = self
            .pre_navigation_delay_max_ms
            .max(self.pre_navigation_delay_min_ms)
            .saturating_add((retries + 1).saturating_mul(self.navigation_timeout_ms))
            .saturating_add(retries.saturating_mul(self.retry_backoff_ms))
            .saturating_add(
                (container_candidates as u64).saturating_mul(self.selector_timeout_ms),
            )
            .saturating_add(self.fetch_slack_ms);
        Duration::from_millis(ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sessions: 3,
            navigation_timeout_ms: 30_000,
            navigation_retries: 2,
            retry_backoff_ms: 2_000,
            selector_timeout_ms: 5_000,
            selector_poll_ms: 250,
            pre_navigation_delay_min_ms: 150,
            pre_navigation_delay_max_ms: 750,
            fetch_slack_ms: 10_000,
            chromium_path: None,
        }
    }
}

/// Chat-completion settings for query enhancement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Whether the external enhancement call may be attempted.
    pub fn has_credentials(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 200,
            timeout_ms: 10_000,
        }
    }
}

/// Search entry-point limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub min_query_len: usize,
    /// How many enhancer suggestions the cascade tries.
    pub max_suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            min_query_len: 2,
            max_suggestions: 2,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overlaid with `PARTSCOUT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = parse_var(&lookup, "PARTSCOUT_HTTP_TIMEOUT_MS") {
            cfg.http.timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "PARTSCOUT_MAX_SESSIONS") {
            cfg.render.max_sessions = v;
        }
        if let Some(v) = parse_var(&lookup, "PARTSCOUT_NAV_TIMEOUT_MS") {
            cfg.render.navigation_timeout_ms = v;
        }
        if let Some(v) = lookup("PARTSCOUT_DISABLE_BROWSER") {
            cfg.render.enabled = !matches!(v.trim(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("PARTSCOUT_CHROMIUM_PATH").filter(|v| !v.is_empty()) {
            cfg.render.chromium_path = Some(v);
        }

        cfg.llm.api_key = lookup("PARTSCOUT_LLM_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if let Some(v) = lookup("PARTSCOUT_LLM_MODEL").filter(|v| !v.is_empty()) {
            cfg.llm.model = v;
        }
        if let Some(v) = lookup("PARTSCOUT_LLM_ENDPOINT").filter(|v| !v.is_empty()) {
            cfg.llm.endpoint = v;
        }

        cfg
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring malformed {key}={raw:?}");
            None
        }
    }
}
