use std::sync::Arc;

use serde::Deserialize;

use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::recommend::Category;

const SYSTEM_PROMPT: &str = "반드시 유효한 JSON만 출력하세요.";

/// Region name and optional category resolved from a free-text request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub region: String,
    pub category: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct ExtractionReply {
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    cat1: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum ExtractError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("reply is not an extraction object: {0}")]
    Reply(#[from] serde_json::Error),
}

pub struct RegionCategoryExtractor {
    llm: Arc<dyn LanguageModel>,
    config: LlmConfig,
    region_hints: Vec<String>,
}

impl RegionCategoryExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>, config: LlmConfig, region_hints: Vec<String>) -> Self {
        Self {
            llm,
            config,
            region_hints,
        }
    }

    /// Never fails: a model error falls back to the region-hint heuristic
    /// with no category.
    pub fn extract(&self, query: &str) -> Extraction {
        match self.ask(query) {
            Ok(reply) => {
                let category = reply.cat1.as_deref().and_then(Category::from_code);
                let region = reply.region.unwrap_or_default().trim().to_string();
                let region = if region.is_empty() {
                    self.hint_region(query)
                } else {
                    region
                };
                Extraction { region, category }
            }
            Err(e) => {
                log::warn!("extraction failed, using region hints: {e}");
                Extraction {
                    region: self.hint_region(query),
                    category: None,
                }
            }
        }
    }

    fn ask(&self, query: &str) -> Result<ExtractionReply, ExtractError> {
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(query),
            temperature: self.config.extract_temperature,
            max_tokens: self.config.extract_max_tokens,
            json: true,
        };

        let text = self.llm.complete(&request)?;
        let text = text.trim();
        let reply = serde_json::from_str(if text.is_empty() { "{}" } else { text })?;
        Ok(reply)
    }

    /// First configured hint contained in the query, else the trimmed query.
    pub fn hint_region(&self, query: &str) -> String {
        let query = query.trim();
        self.region_hints
            .iter()
            .find(|hint| !hint.is_empty() && query.contains(hint.as_str()))
            .cloned()
            .unwrap_or_else(|| query.to_string())
    }
}

fn user_prompt(query: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("- {} : {}", c.code(), c.label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "다음 한국어 요청에서\n\
         1) 지역명 1개(예: 제주, 부산, 강릉)와\n\
         2) 아래 목록 중 가장 가까운 대분류 cat1 코드 1개\n\
         를 JSON으로만 출력하세요.\n\n\
         대분류 목록:\n{categories}\n\n\
         출력 스키마:\n{{\"region\":\"제주\",\"cat1\":\"A01\"}}\n\n\
         요청: {query}"
    )
}
