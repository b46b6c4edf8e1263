use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::ApiKey;

/// One text-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Ask the model for machine-parseable JSON instead of free text
    pub json_mode: bool,
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn text(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            json_mode: false,
            response_schema: None,
        }
    }

    pub fn json(model: &str, prompt: String) -> Self {
        Self {
            json_mode: true,
            ..Self::text(model, prompt)
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model request failed ({}): {message}", status_label(.status))]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not decode model response: {0}")]
    Decode(String),

    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl ModelError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ModelError::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ModelError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ModelError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status".to_string(),
    }
}

/// A remote text-generation backend.
/// Implementations must treat absent or empty text as `ModelError::EmptyResponse`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ModelError>;
}

// ---- Gemini wire format ----

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Option<Duration>,
}

impl GeminiClient {
    pub fn new(
        endpoint: &str,
        api_key: ApiKey,
        timeout: Option<Duration>,
    ) -> Result<Self, ModelError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ModelError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            return ModelError::Timeout(self.timeout.unwrap_or_default());
        }
        ModelError::Remote {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, request.model);
        let body = build_request_body(&request);

        debug!(
            model = %request.model,
            json_mode = request.json_mode,
            prompt_chars = request.prompt.len(),
            "sending generateContent request"
        );

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        let raw = resp.text().await.map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(decode_error_body(status.as_u16(), &raw));
        }

        extract_text(&raw)
    }
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest {
    let generation_config = request.json_mode.then(|| GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: request.response_schema.clone(),
    });

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".into(),
            parts: vec![Part {
                text: Some(request.prompt.clone()),
            }],
        }],
        generation_config,
    }
}

fn decode_error_body(status: u16, raw: &str) -> ModelError {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => ModelError::Remote {
            status: Some(envelope.error.code.unwrap_or(status)),
            message: if envelope.error.status.is_empty() {
                envelope.error.message
            } else {
                format!("{}: {}", envelope.error.status, envelope.error.message)
            },
        },
        Err(_) => ModelError::remote(status, raw.trim()),
    }
}

/// Concatenated text of the first candidate. Missing or blank text is an error.
fn extract_text(raw: &str) -> Result<String, ModelError> {
    let resp: GenerateContentResponse =
        serde_json::from_str(raw).map_err(|e| ModelError::Decode(e.to_string()))?;

    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

/// In-memory client that replays queued outcomes and records every request. Used by the tests.
#[derive(Default)]
pub struct ScriptedClient {
    outcomes: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    pub fn new(outcomes: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ModelError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front())
            .unwrap_or(Err(ModelError::EmptyResponse));

        match next {
            Ok(text) if text.trim().is_empty() => Err(ModelError::EmptyResponse),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_request_sets_mime_type_and_schema() {
        let request = GenerationRequest::json("gemini-2.5-flash", "prompt".into())
            .with_schema(json!({"type": "OBJECT"}));
        let body = serde_json::to_value(build_request_body(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn text_request_has_no_generation_config() {
        let request = GenerationRequest::text("gemini-2.5-flash", "prompt".into());
        let body = serde_json::to_value(build_request_body(&request)).unwrap();
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn extracts_and_joins_candidate_parts() {
        let raw = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "world"}]}}]}"#;
        assert_eq!(extract_text(raw).unwrap(), "Hello world");
    }

    #[test]
    fn blocked_or_blank_response_is_empty_error() {
        let blocked = r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert_eq!(extract_text(blocked), Err(ModelError::EmptyResponse));

        let blank = r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#;
        assert_eq!(extract_text(blank), Err(ModelError::EmptyResponse));
    }

    #[test]
    fn error_envelope_keeps_code_and_status() {
        let raw = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = decode_error_body(429, raw);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.message(), "RESOURCE_EXHAUSTED: Quota exceeded");
    }

    #[test]
    fn non_json_error_body_falls_back_to_http_status() {
        let err = decode_error_body(503, "Service Unavailable\n");
        assert_eq!(err, ModelError::remote(503, "Service Unavailable"));
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_and_records() {
        let client = ScriptedClient::new([Ok("first".to_string()), Ok(String::new())]);

        let first = client
            .generate(GenerationRequest::text("m", "a".into()))
            .await;
        let second = client
            .generate(GenerationRequest::json("m", "b".into()))
            .await;
        let third = client
            .generate(GenerationRequest::text("m", "c".into()))
            .await;

        assert_eq!(first.unwrap(), "first");
        assert_eq!(second, Err(ModelError::EmptyResponse));
        assert_eq!(third, Err(ModelError::EmptyResponse));
        assert_eq!(client.call_count(), 3);
        assert!(client.requests()[1].json_mode);
    }
}
