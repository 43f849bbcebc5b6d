use clap::{Parser, Subcommand};

mod commands;
mod errors;
mod handlers;
mod types;
mod validation;

pub use handlers::*;
pub use types::*;

#[derive(Parser, Debug)]
#[command(version, about = "Korean travel destination recommender", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recommend destinations for a free-text request
    Search {
        /// e.g. "제주 자연 여행"
        query: String,

        /// Number of cards (defaults to recommend.num_recommend)
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        /// Fixed sampling seed
        #[clap(long)]
        seed: Option<u64>,
    },

    /// Show the region and category resolved from a request
    Extract { query: String },

    /// Inspect or reset the search cache
    Cache {
        #[clap(subcommand)]
        action: CacheArgs,
    },

    /// Download an image through the validator and save it
    FetchImage {
        url: String,

        /// Output file
        out: std::path::PathBuf,
    },
}
