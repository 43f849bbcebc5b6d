//! Embedding capability.
//!
//! The orchestrator only needs `embed(text) -> vector`; which model produces
//! the vector is a deployment choice:
//! - `OpenAiEmbedder`: remote `/embeddings` endpoint
//! - `LocalEmbedder`: fastembed, downloaded on first use

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::http::get_error;

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Embeddings from an OpenAI-compatible API.
pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(llm: &LlmConfig, config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::InitFailed(get_error(&e)))?;

        Ok(Self {
            client,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn extract_vector(resp: &Value) -> Result<Vec<f32>, EmbeddingError> {
        let values = resp
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))?;

        values
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    EmbeddingError::EmbeddingFailed(format!("non-numeric component: {v}"))
                })
            })
            .collect()
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": [text] }))
            .send()
            .map_err(|e| EmbeddingError::EmbeddingFailed(get_error(&e)))?;

        let status = resp.status();
        let payload = resp
            .json::<Value>()
            .map_err(|e| EmbeddingError::EmbeddingFailed(get_error(&e)))?;

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown");
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "status {}: {message}",
                status.as_u16()
            )));
        }

        Self::extract_vector(&payload)
    }
}
