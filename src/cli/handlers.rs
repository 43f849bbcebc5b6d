use std::path::PathBuf;

use anyhow::Result;

use crate::{
    cli::commands::{CacheCommand, ExtractCommand, FetchImageCommand, SearchCommand},
    config::Config,
    factory::AppFactory,
};

use super::types::CacheArgs;

pub fn handle_search(
    query: String,
    top_k: Option<usize>,
    seed: Option<u64>,
    mut config: Config,
) -> Result<()> {
    if seed.is_some() {
        config.recommend.seed = seed;
    }

    let command = SearchCommand::new(query, top_k)?;
    let orchestrator = AppFactory::create_orchestrator(&config)?;
    command.execute(&orchestrator, &mut std::io::stdout())?;
    Ok(())
}

pub fn handle_extract(query: String, config: Config) -> Result<()> {
    let command = ExtractCommand::new(query)?;
    let llm = AppFactory::create_language_model(&config)?;
    let extractor = AppFactory::create_extractor(&config, llm);
    command.execute(&extractor, &mut std::io::stdout())?;
    Ok(())
}

pub fn handle_cache(action: CacheArgs, config: Config) -> Result<()> {
    let cache = AppFactory::open_cache(&config)?;
    CacheCommand::new(action).execute(&cache, &mut std::io::stdout())?;
    Ok(())
}

pub fn handle_fetch_image(url: String, out: PathBuf, config: Config) -> Result<()> {
    let command = FetchImageCommand::new(url, out)?;
    let validator = AppFactory::create_validator(&config, AppFactory::create_transport()?);
    command.execute(&validator, &mut std::io::stdout())?;
    Ok(())
}
