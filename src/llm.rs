//! Language-model capability: one chat completion per call.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::http::get_error;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected model response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to force a syntactically valid JSON object
    pub json: bool,
}

pub trait LanguageModel: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiChat {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(get_error(&e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    fn extract_content(resp: &Value) -> Result<String, LlmError> {
        resp.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_owned)
            .ok_or_else(|| LlmError::Malformed("missing choices[0].message.content".into()))
    }
}

impl LanguageModel for OpenAiChat {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .map_err(|e| LlmError::Request(get_error(&e)))?;

        let status = resp.status();
        let payload = resp
            .json::<Value>()
            .map_err(|e| LlmError::Malformed(get_error(&e)))?;

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Self::extract_content(&payload)
    }
}
