//! Language-model escalation for queries no rule recognizes.
//!
//! The model is asked for a strict JSON object
//! `{enhancedQuery, alternatives, confidence, reasoning}`. Replies that are not
//! valid JSON are salvaged by picking the first plausible line of free text.

use crate::config::LlmConfig;
use crate::errors::EnhancementError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Confidence assigned to a line salvaged from free text.
pub const LINE_FALLBACK_CONFIDENCE: f32 = 0.5;
/// Confidence used when the JSON reply omits one.
const DEFAULT_JSON_CONFIDENCE: f32 = 0.7;
const MAX_ALTERNATIVES: usize = 5;
const MAX_QUERY_CHARS: usize = 120;

pub const SYSTEM_PROMPT: &str = "You rewrite search queries for an industrial parts catalog \
(bearings, belts, motors, valves, seals, fasteners). Reply with JSON only: \
{\"enhancedQuery\": string, \"alternatives\": [string], \"confidence\": number between 0 and 1, \
\"reasoning\": string}. Keep queries short and use catalog terminology.";

/// A chat-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Raw assistant text for the given prompts.
    async fn complete(&self, system: &str, user: &str) -> Result<String, EnhancementError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, EnhancementError> {
        let key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(EnhancementError::MissingCredentials)?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| EnhancementError::Request(format!("invalid API key header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| EnhancementError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, EnhancementError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnhancementError::Request("completion request timed out".to_string())
                } else {
                    EnhancementError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EnhancementError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| EnhancementError::Decode(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| EnhancementError::Decode("completion had no content".to_string()))
    }
}

/// The user prompt for `query`.
pub fn user_prompt(query: &str) -> String {
    format!("Improve this parts search query: {query:?}")
}

/// Decoded model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub enhanced_query: String,
    pub alternatives: Vec<String>,
    pub confidence: f32,
    /// True when the strict JSON contract held.
    pub structured: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrictReply {
    enhanced_query: String,
    #[serde(default)]
    alternatives: Vec<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Two-stage decode: the strict JSON contract, then a line heuristic.
pub fn decode_reply(text: &str) -> Result<Suggestion, EnhancementError> {
    if let Some(s) = decode_strict(text) {
        return Ok(s);
    }
    tracing::debug!("completion was not strict JSON, trying line heuristic");
    decode_lines(text)
        .ok_or_else(|| EnhancementError::Decode("no usable query in completion".to_string()))
}

fn decode_strict(text: &str) -> Option<Suggestion> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let reply: StrictReply = serde_json::from_str(&text[start..=end]).ok()?;
    let enhanced_query = clean_query(&reply.enhanced_query)?;
    if let Some(reasoning) = &reply.reasoning {
        tracing::debug!("model reasoning: {reasoning}");
    }

    let mut alternatives: Vec<String> = Vec::new();
    for alt in reply.alternatives.iter().filter_map(|a| clean_query(a)) {
        if !alt.eq_ignore_ascii_case(&enhanced_query)
            && !alternatives.iter().any(|a| a.eq_ignore_ascii_case(&alt))
        {
            alternatives.push(alt);
        }
    }
    alternatives.truncate(MAX_ALTERNATIVES);

    let confidence = reply
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_JSON_CONFIDENCE)
        .clamp(0.0, 1.0);

    Some(Suggestion {
        enhanced_query,
        alternatives,
        confidence,
        structured: true,
    })
}

/// First line that reads like a search query rather than prose or markup.
fn decode_lines(text: &str) -> Option<Suggestion> {
    let mut lines = text
        .lines()
        .map(strip_line_decoration)
        .filter(|l| looks_like_query(l))
        .filter_map(clean_query);

    let enhanced_query = lines.next()?;
    let alternatives = lines
        .filter(|l| !l.eq_ignore_ascii_case(&enhanced_query))
        .take(MAX_ALTERNATIVES)
        .collect();

    Some(Suggestion {
        enhanced_query,
        alternatives,
        confidence: LINE_FALLBACK_CONFIDENCE,
        structured: false,
    })
}

/// Drops list markers, labels and surrounding quotes.
fn strip_line_decoration(line: &str) -> &str {
    let mut l = line.trim().trim_start_matches(['-', '*', '•']).trim_start();
    let digits = l.len() - l.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 && l[digits..].starts_with(['.', ')']) {
        l = l[digits + 1..].trim_start();
    }
    if let Some((label, rest)) = l.split_once(':') {
        let label = label.trim().to_lowercase();
        if label.contains("query") || label.contains("search") || label.contains("alternative") {
            l = rest;
        }
    }
    l.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

fn looks_like_query(line: &str) -> bool {
    let words = line.split_whitespace().count();
    (1..=8).contains(&words)
        && !line.starts_with("```")
        && !line.contains(['{', '}'])
        && !line.ends_with(':')
        && !line.ends_with('.')
}

fn clean_query(q: &str) -> Option<String> {
    let collapsed = q.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty() && collapsed.chars().count() <= MAX_QUERY_CHARS).then_some(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".into()),
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            timeout_ms: 2_000,
            ..LlmConfig::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_strict_json_decode() {
        let s = decode_reply(
            r#"{"enhancedQuery": "hydraulic gear pump", "alternatives": ["gear pump", "hydraulic gear pump", ""], "confidence": 0.85, "reasoning": "pump"}"#,
        )
        .unwrap();
        assert!(s.structured);
        assert_eq!(s.enhanced_query, "hydraulic gear pump");
        assert_eq!(s.alternatives, vec!["gear pump"]);
        assert!((s.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_fenced_json_decode() {
        let text = "```json\n{\"enhancedQuery\": \"pillow block bearing\", \"confidence\": 3}\n```";
        let s = decode_reply(text).unwrap();
        assert_eq!(s.enhanced_query, "pillow block bearing");
        assert_eq!(s.confidence, 1.0);
    }

    #[test]
    fn test_line_heuristic_fallback() {
        let text = "Sure! Here are some better searches:\n\n1. \"sealed ball bearing\"\n2. deep groove bearing\n";
        let s = decode_reply(text).unwrap();
        assert!(!s.structured);
        assert_eq!(s.enhanced_query, "sealed ball bearing");
        assert_eq!(s.alternatives, vec!["deep groove bearing"]);
        assert!((s.confidence - LINE_FALLBACK_CONFIDENCE).abs() < 1e-6);
    }

    #[test]
    fn test_labelled_line() {
        let s = decode_reply("Enhanced query: 3/4 inch ball valve").unwrap();
        assert_eq!(s.enhanced_query, "3/4 inch ball valve");
    }

    #[test]
    fn test_undecodable_reply() {
        assert!(matches!(
            decode_reply("I am not able to help with that request today, sorry."),
            Err(EnhancementError::Decode(_))
        ));
    }

    #[test]
    fn test_client_requires_key() {
        assert!(matches!(
            ChatCompletionClient::new(&LlmConfig::default()),
            Err(EnhancementError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_complete_sends_contract() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 200
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("v-belt")))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
        let text = client.complete(SYSTEM_PROMPT, &user_prompt("belt thing")).await.unwrap();
        assert_eq!(text, "v-belt");
    }

    #[tokio::test]
    async fn test_complete_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
        match client.complete("s", "u").await {
            Err(EnhancementError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
        assert!(matches!(
            client.complete("s", "u").await,
            Err(EnhancementError::Decode(_))
        ));
    }
}
