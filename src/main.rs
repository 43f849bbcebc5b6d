use clap::Parser;
use tracing_subscriber::EnvFilter;

mod card;
mod catalog;
mod cli;
mod config;
mod factory;
mod http;
mod images;
mod llm;
mod lock;
mod recommend;
mod search;
mod semantic;
#[cfg(test)]
mod tests;

use factory::AppFactory;

fn init_logging() {
    // RUST_LOG wins; default keeps our info lines and quiets dependencies
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tourpick=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();
    let config = AppFactory::load_config()?;

    match args.command {
        cli::Command::Search { query, top_k, seed } => {
            cli::handle_search(query, top_k, seed, config)
        }
        cli::Command::Extract { query } => cli::handle_extract(query, config),
        cli::Command::Cache { action } => cli::handle_cache(action, config),
        cli::Command::FetchImage { url, out } => cli::handle_fetch_image(url, out, config),
    }
}
