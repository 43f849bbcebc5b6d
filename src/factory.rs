use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use homedir::my_home;

use crate::catalog::TourismCatalogClient;
use crate::config::{Config, EmbeddingProvider};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::images::{ImageResolutionCache, ImageValidator};
use crate::llm::{LanguageModel, OpenAiChat};
use crate::recommend::{RecommendationPipeline, RegionCategoryExtractor, Summarizer};
use crate::search::SearchOrchestrator;
use crate::semantic::{Embedder, OpenAiEmbedder, SimilarityCache};

const BASE_PATH_ENV: &str = "TOURPICK_BASE_PATH";

/// Builds the production object graph from configuration.
pub struct AppFactory;

impl AppFactory {
    /// `$TOURPICK_BASE_PATH`, else `~/.local/share/tourpick`.
    pub fn base_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(BASE_PATH_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let home = my_home()
            .context("could not determine home directory")?
            .context("home directory path is empty")?;
        Ok(home.join(".local/share/tourpick"))
    }

    pub fn load_config() -> Result<Config> {
        let base_path = Self::base_path()?;
        Config::load_with(&base_path)
    }

    pub fn create_transport() -> Result<Arc<dyn HttpTransport>> {
        let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
        Ok(Arc::new(transport))
    }

    pub fn create_language_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
        if config.llm.api_key.trim().is_empty() {
            log::warn!("llm.api_key is empty; extraction and summaries will use fallbacks");
        }
        let chat = OpenAiChat::new(&config.llm).context("failed to build model client")?;
        Ok(Arc::new(chat))
    }

    pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
        match config.embedding.provider {
            EmbeddingProvider::Openai => {
                let embedder = OpenAiEmbedder::new(&config.llm, &config.embedding)
                    .context("failed to build embedding client")?;
                Ok(Arc::new(embedder))
            }
            #[cfg(feature = "local-embed")]
            EmbeddingProvider::Local => {
                let embedder = crate::semantic::LocalEmbedder::new(
                    &config.embedding.local_model,
                    config.base_path(),
                )
                .context("failed to load local embedding model")?;
                log::info!(
                    "local embedder model={} dimensions={}",
                    embedder.name(),
                    embedder.dimensions()
                );
                Ok(Arc::new(embedder))
            }
            #[cfg(not(feature = "local-embed"))]
            EmbeddingProvider::Local => {
                bail!("embedding.provider is 'local' but this build lacks the local-embed feature")
            }
        }
    }

    pub fn create_validator(config: &Config, http: Arc<dyn HttpTransport>) -> ImageValidator {
        ImageValidator::new(config.image.clone(), http)
    }

    pub fn create_extractor(config: &Config, llm: Arc<dyn LanguageModel>) -> RegionCategoryExtractor {
        RegionCategoryExtractor::new(llm, config.llm.clone(), config.recommend.region_hints.clone())
    }

    pub fn open_cache(config: &Config) -> Result<SimilarityCache> {
        let path = config.cache_path();
        SimilarityCache::open(path.clone(), config.cache.max_items)
            .with_context(|| format!("failed to open cache {}", path.display()))
    }

    /// Pipeline over the given capabilities.
    pub fn create_pipeline(
        config: &Config,
        http: Arc<dyn HttpTransport>,
        llm: Arc<dyn LanguageModel>,
    ) -> RecommendationPipeline {
        RecommendationPipeline::new(
            config.recommend.clone(),
            Self::create_extractor(config, llm.clone()),
            Summarizer::new(llm, config.llm.clone()),
            TourismCatalogClient::new(config.tour_api.clone(), http.clone()),
            Self::create_validator(config, http),
            ImageResolutionCache::new(config.image.cache_ttl_secs, config.image.cache_max),
        )
    }

    pub fn create_orchestrator_with(
        config: &Config,
        http: Arc<dyn HttpTransport>,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<SearchOrchestrator> {
        Ok(SearchOrchestrator::new(
            embedder,
            Self::open_cache(config)?,
            Self::create_pipeline(config, http, llm),
            config.cache.similarity_threshold,
            config.recommend.num_recommend,
        ))
    }

    pub fn create_orchestrator(config: &Config) -> Result<SearchOrchestrator> {
        if config.tour_api.api_key.trim().is_empty() {
            bail!("tour_api.api_key is empty; set it in config.yaml or KOREA_TOURISM_API_KEY");
        }

        Self::create_orchestrator_with(
            config,
            Self::create_transport()?,
            Self::create_language_model(config)?,
            Self::create_embedder(config)?,
        )
    }
}
