use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

const TOUR_API_KEY_ENV: &str = "KOREA_TOURISM_API_KEY";
const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default similarity threshold for treating a past query as the same request
const DEFAULT_CACHE_THRESHOLD: f32 = 0.82;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TourApiConfig {
    #[serde(default = "default_tour_base_url")]
    pub base_url: String,
    /// Decoded service key. A percent-encoded key is decoded before use.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tour_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_mobile_os")]
    pub mobile_os: String,
    #[serde(default = "default_mobile_app")]
    pub mobile_app: String,
}

impl Default for TourApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_tour_base_url(),
            api_key: String::new(),
            timeout_secs: default_tour_timeout_secs(),
            mobile_os: default_mobile_os(),
            mobile_app: default_mobile_app(),
        }
    }
}

fn default_tour_base_url() -> String {
    "http://apis.data.go.kr/B551011/KorService2".to_string()
}

fn default_tour_timeout_secs() -> u64 {
    10
}

fn default_mobile_os() -> String {
    "ETC".to_string()
}

fn default_mobile_app() -> String {
    "TourAPI".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extract_temperature: f32,
    #[serde(default = "default_extract_max_tokens")]
    pub extract_max_tokens: u32,
    #[serde(default)]
    pub summary_temperature: f32,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            extract_temperature: 0.0,
            extract_max_tokens: default_extract_max_tokens(),
            summary_temperature: 0.0,
            summary_max_tokens: default_summary_max_tokens(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_extract_max_tokens() -> u32 {
    120
}

fn default_summary_max_tokens() -> u32 {
    80
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Openai,
    Local,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    /// Remote embedding model, served from `llm.base_url`
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// In-process model used when `provider: local`
    #[serde(default = "default_local_model")]
    pub local_model: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            local_model: default_local_model(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_local_model() -> String {
    "multilingual-e5-small".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendConfig {
    #[serde(default = "default_num_recommend")]
    pub num_recommend: usize,
    /// Over-fetch factor applied to the requested count
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,
    #[serde(default = "default_min_fetch")]
    pub min_fetch: usize,
    #[serde(default = "default_enrich_workers")]
    pub enrich_workers: usize,
    /// Wall-clock budget for enriching a single item
    #[serde(default = "default_item_budget_secs")]
    pub item_budget_secs: u64,
    /// Fixed sampling seed; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_region_hints")]
    pub region_hints: Vec<String>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            num_recommend: default_num_recommend(),
            fetch_multiplier: default_fetch_multiplier(),
            min_fetch: default_min_fetch(),
            enrich_workers: default_enrich_workers(),
            item_budget_secs: default_item_budget_secs(),
            seed: None,
            region_hints: default_region_hints(),
        }
    }
}

fn default_num_recommend() -> usize {
    5
}

fn default_fetch_multiplier() -> usize {
    6
}

fn default_min_fetch() -> usize {
    80
}

fn default_enrich_workers() -> usize {
    4
}

fn default_item_budget_secs() -> u64 {
    45
}

pub fn default_region_hints() -> Vec<String> {
    [
        "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "경기", "강원", "충북",
        "충남", "전북", "전남", "경북", "경남", "제주", "강원특별자치도", "제주특별자치도",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_cache_ttl_secs")]
    pub cache_ttl_secs: i64,
    #[serde(default = "default_image_cache_max")]
    pub cache_max: usize,
    #[serde(default = "default_image_min_bytes")]
    pub min_bytes: u64,
    #[serde(default = "default_image_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_allowed_exts")]
    pub allowed_exts: Vec<String>,
    #[serde(default = "default_deny_domains")]
    pub deny_domains: Vec<String>,
    #[serde(default = "default_require_head_ok")]
    pub require_head_ok: bool,
    /// Hosts whose HEAD responses are unreliable; the probe is skipped for them
    #[serde(default = "default_head_skip_hosts")]
    pub head_skip_hosts: Vec<String>,
    #[serde(default = "default_head_timeout_secs")]
    pub head_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_image_cache_ttl_secs(),
            cache_max: default_image_cache_max(),
            min_bytes: default_image_min_bytes(),
            max_bytes: default_image_max_bytes(),
            allowed_exts: default_allowed_exts(),
            deny_domains: default_deny_domains(),
            require_head_ok: default_require_head_ok(),
            head_skip_hosts: default_head_skip_hosts(),
            head_timeout_secs: default_head_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_image_cache_ttl_secs() -> i64 {
    7 * 24 * 3600
}

fn default_image_cache_max() -> usize {
    1000
}

fn default_image_min_bytes() -> u64 {
    1024
}

fn default_image_max_bytes() -> u64 {
    15 * 1024 * 1024
}

fn default_allowed_exts() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()]
}

fn default_deny_domains() -> Vec<String> {
    vec!["example.com".into(), "localhost".into(), "127.0.0.1".into()]
}

fn default_require_head_ok() -> bool {
    true
}

fn default_head_skip_hosts() -> Vec<String> {
    vec!["tong.visitkorea.or.kr".into()]
}

fn default_head_timeout_secs() -> u64 {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// JSONL store, relative paths resolve against the base directory
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_cache_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_cache_max_items")]
    pub max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            similarity_threshold: DEFAULT_CACHE_THRESHOLD,
            max_items: default_cache_max_items(),
        }
    }
}

fn default_cache_path() -> String {
    "vector_cache.jsonl".to_string()
}

fn default_cache_threshold() -> f32 {
    DEFAULT_CACHE_THRESHOLD
}

fn default_cache_max_items() -> usize {
    500
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tour_api: TourApiConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cache.similarity_threshold) {
            bail!(
                "cache.similarity_threshold must be between 0.0 and 1.0, got {}",
                self.cache.similarity_threshold
            );
        }

        if self.cache.max_items == 0 {
            bail!("cache.max_items must be greater than 0");
        }

        if self.image.min_bytes > self.image.max_bytes {
            bail!(
                "image.min_bytes ({}) must not exceed image.max_bytes ({})",
                self.image.min_bytes,
                self.image.max_bytes
            );
        }

        if self.recommend.enrich_workers == 0 {
            bail!("recommend.enrich_workers must be at least 1");
        }

        if self.recommend.fetch_multiplier == 0 {
            bail!("recommend.fetch_multiplier must be at least 1");
        }

        Ok(())
    }

    /// Loads `config.yaml` from `base_path`, writing defaults on first run.
    ///
    /// API keys come from the environment when the file leaves them empty, and
    /// are never written back.
    pub fn load_with(base_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_path)
            .with_context(|| format!("failed to create {}", base_path.display()))?;

        let config_path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !config_path.exists() {
            let defaults = serde_yml::to_string(&Self::default())?;
            std::fs::write(&config_path, defaults)
                .with_context(|| format!("failed to write {}", config_path.display()))?;
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();
        config.validate()?;

        // resave in case new keys were added
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        config.apply_env();

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(self.base_path.join(CONFIG_FILE), config_str)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(key) = non_empty_env(TOUR_API_KEY_ENV) {
            if self.tour_api.api_key.trim().is_empty() {
                self.tour_api.api_key = key;
            }
        }
        if let Some(key) = non_empty_env(OPENAI_API_KEY_ENV) {
            if self.llm.api_key.trim().is_empty() {
                self.llm.api_key = key;
            }
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn cache_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.cache.path);
        if path.is_absolute() {
            path
        } else {
            self.base_path.join(path)
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
