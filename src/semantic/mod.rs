//! Query embeddings and the approximate-match result cache.
//!
//! - `embeddings`: embedding capability and the HTTP provider
//! - `local`: in-process fastembed provider (feature `local-embed`)
//! - `similarity`: cosine similarity
//! - `cache`: JSONL store of past queries, their vectors and cards

pub mod cache;
pub mod embeddings;
#[cfg(feature = "local-embed")]
pub mod local;
mod similarity;

pub use cache::{CacheError, SimilarityCache};
pub use embeddings::{Embedder, EmbeddingError, OpenAiEmbedder};
#[cfg(feature = "local-embed")]
pub use local::LocalEmbedder;
pub use similarity::cosine_similarity;
