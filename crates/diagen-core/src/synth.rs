//! Text-generation collaborator: turns a prompt into diagram script text.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::{DiagenError, GenerationRequest, Result};

/// Generation stops when the model emits the closing code fence.
pub const STOP_MARKER: &str = "```";

/// Assistant turn prefilled so the model continues straight into code.
const ASSISTANT_PREFILL: &str = "Here is the code with no explanation ```python";

/// System prompt for diagram script synthesis.
pub const SYSTEM_PROMPT: &str = "\
You are an expert python programmer that has mastered the Diagrams library. \
You are able to write code to generate AWS diagrams based on what the user asks. \
Only return the code as it will be run through a program to generate the diagram for the user.";

/// Collaborator that synthesizes source text from a prompt pair.
///
/// Implementations return the generated text up to [`STOP_MARKER`]; no
/// streaming.
#[async_trait]
pub trait ScriptSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<String>;
}

/// Configuration for the HTTP-backed synthesizer.
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Model endpoint the message payload is posted to.
    pub endpoint: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Token budget per generation.
    pub max_tokens: u32,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("DIAGEN_MODEL_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8080/v1/messages".to_string()),
            api_key: std::env::var("DIAGEN_MODEL_API_KEY").ok(),
            max_tokens: 4096,
        }
    }
}

impl SynthesizerConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// HTTP client for a hosted message-style generation endpoint.
pub struct HttpSynthesizer {
    config: SynthesizerConfig,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("diagen/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create HTTP client");
        Self { config, client }
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": self.config.max_tokens,
            "system": request.system_prompt,
            "stop_sequences": [STOP_MARKER],
            "messages": [
                {
                    "role": "user",
                    "content": [{"type": "text", "text": request.user_prompt}],
                },
                {
                    "role": "assistant",
                    "content": [{"type": "text", "text": ASSISTANT_PREFILL}],
                },
            ],
        })
    }
}

#[async_trait]
impl ScriptSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<String> {
        debug!(event = "synth.request", endpoint = %self.config.endpoint);

        let mut http_request = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request_body(request));
        if let Some(key) = &self.config.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DiagenError::Synthesis(e.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DiagenError::Synthesis(e.to_string()))?;

        payload
            .pointer("/content/0/text")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DiagenError::Synthesis("response missing content text".to_string()))
    }
}

/// Synthesizer that always returns a fixed script. Test double, also used
/// for offline dry runs.
#[derive(Debug, Clone)]
pub struct StaticSynthesizer {
    script: String,
}

impl StaticSynthesizer {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl ScriptSynthesizer for StaticSynthesizer {
    async fn synthesize(&self, _request: &GenerationRequest) -> Result<String> {
        Ok(self.script.clone())
    }
}
