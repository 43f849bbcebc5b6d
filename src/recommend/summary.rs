use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LanguageModel};

const SYSTEM_PROMPT: &str = "한국어 문장 하나로만 답해. 금지어: 요약,정리,한줄,한 문장. 28~48자.";
const EXAMPLE: &str = "예시입력: 천지연폭포는 계곡과 숲길이 아름답습니다.\n\
                       예시출력: 숲길과 어우러진 천지연폭포의 경치를 즐길 수 있습니다.\n\n";

/// Characters kept from the overview when the model is unavailable
const FALLBACK_CHARS: usize = 40;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?。]\s*").unwrap());

/// One-line Korean rationale for a destination, generated from its overview.
pub struct Summarizer {
    llm: Arc<dyn LanguageModel>,
    config: LlmConfig,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LanguageModel>, config: LlmConfig) -> Self {
        Self { llm, config }
    }

    /// Empty when the overview is empty or the model answered with nothing.
    pub fn summarize(&self, overview: &str) -> String {
        let text = overview.trim();
        if text.is_empty() {
            return String::new();
        }

        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!("{EXAMPLE}다음 글을 같은 형식으로 요약:\n{text}"),
            temperature: self.config.summary_temperature,
            max_tokens: self.config.summary_max_tokens,
            json: false,
        };

        match self.llm.complete(&request) {
            Ok(reply) => {
                let sentence = first_sentence(&reply);
                if sentence.is_empty() {
                    String::new()
                } else {
                    format!("{sentence}.")
                }
            }
            Err(e) => {
                log::warn!("summary failed, truncating overview: {e}");
                truncate_overview(text)
            }
        }
    }
}

/// Text before the first sentence terminator, trimmed.
pub fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    SENTENCE_END
        .splitn(text, 2)
        .next()
        .unwrap_or_default()
        .trim()
}

fn truncate_overview(text: &str) -> String {
    let sentence = first_sentence(text);
    if sentence.chars().count() > FALLBACK_CHARS {
        let head: String = sentence.chars().take(FALLBACK_CHARS).collect();
        format!("{head}...")
    } else {
        sentence.to_string()
    }
}
