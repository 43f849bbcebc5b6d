use std::io::Write;
use std::path::PathBuf;

use serde_json::json;

use crate::{
    cli::{
        errors::{CliError, CliResult},
        validation::*,
        CacheArgs,
    },
    images::ImageValidator,
    recommend::RegionCategoryExtractor,
    search::{SearchOrchestrator, SearchOutcome},
    semantic::SimilarityCache,
};

/// Command for recommending destinations
#[derive(Debug, Clone)]
pub struct SearchCommand {
    pub query: String,
    pub top_k: Option<usize>,
}

impl SearchCommand {
    pub fn new(query: String, top_k: Option<usize>) -> CliResult<Self> {
        validate_query(&query)?;
        validate_top_k(top_k)?;
        Ok(Self { query, top_k })
    }

    pub fn execute(self, orchestrator: &SearchOrchestrator, out: &mut dyn Write) -> CliResult<()> {
        match orchestrator.search(&self.query, self.top_k) {
            SearchOutcome::NoQuery => writeln!(out, "No query provided")?,
            SearchOutcome::NoResults => writeln!(out, "No matching results")?,
            SearchOutcome::Cards(cards) => {
                writeln!(out, "{}", serde_json::to_string_pretty(&cards)?)?
            }
        }
        Ok(())
    }
}

/// Command printing the extracted region and category
#[derive(Debug, Clone)]
pub struct ExtractCommand {
    pub query: String,
}

impl ExtractCommand {
    pub fn new(query: String) -> CliResult<Self> {
        if query.trim().is_empty() {
            return Err(CliError::validation("query", "Query cannot be empty"));
        }
        validate_query(&query)?;
        Ok(Self { query })
    }

    pub fn execute(self, extractor: &RegionCategoryExtractor, out: &mut dyn Write) -> CliResult<()> {
        let extraction = extractor.extract(&self.query);
        let report = json!({
            "region": extraction.region,
            "cat1": extraction.category.map(|c| c.code()),
            "label": extraction.category.map(|c| c.label()),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }
}

/// Command for the search cache
#[derive(Debug, Clone)]
pub struct CacheCommand {
    pub action: CacheArgs,
}

impl CacheCommand {
    pub fn new(action: CacheArgs) -> Self {
        Self { action }
    }

    pub fn execute(self, cache: &SimilarityCache, out: &mut dyn Write) -> CliResult<()> {
        match self.action {
            CacheArgs::Stats {} => {
                let count = cache.len()?;
                writeln!(out, "{count} cached searches in {}", cache.path().display())?;
            }
            CacheArgs::Clear {} => {
                cache.clear()?;
                writeln!(out, "Cache cleared")?;
            }
        }
        Ok(())
    }
}

/// Command downloading one image through the validator
#[derive(Debug, Clone)]
pub struct FetchImageCommand {
    pub url: String,
    pub out_path: PathBuf,
}

impl FetchImageCommand {
    pub fn new(url: String, out_path: PathBuf) -> CliResult<Self> {
        validate_url(&url)?;
        Ok(Self { url, out_path })
    }

    pub fn execute(self, validator: &ImageValidator, out: &mut dyn Write) -> CliResult<()> {
        let bytes = validator
            .fetch(&self.url)
            .map_err(|rejection| CliError::image(rejection.to_string()))?;

        std::fs::write(&self.out_path, &bytes)?;
        writeln!(
            out,
            "{} bytes written to {}",
            bytes.len(),
            self.out_path.display()
        )?;
        Ok(())
    }
}
