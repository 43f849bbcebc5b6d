//! Public entry point: semantic cache in front of the recommendation pipeline.

use std::sync::Arc;

use crate::card::Card;
use crate::recommend::RecommendationPipeline;
use crate::semantic::{Embedder, SimilarityCache};

/// What a search produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query was empty; nothing was looked up.
    NoQuery,
    /// The listing had no usable candidates.
    NoResults,
    Cards(Vec<Card>),
}

#[cfg(test)]
impl SearchOutcome {
    pub fn cards(&self) -> &[Card] {
        match self {
            SearchOutcome::Cards(cards) => cards,
            _ => &[],
        }
    }
}

pub struct SearchOrchestrator {
    embedder: Arc<dyn Embedder>,
    cache: SimilarityCache,
    pipeline: RecommendationPipeline,
    threshold: f32,
    default_top_k: usize,
}

impl SearchOrchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        cache: SimilarityCache,
        pipeline: RecommendationPipeline,
        threshold: f32,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            cache,
            pipeline,
            threshold,
            default_top_k,
        }
    }

    /// Returns the nearest past result when it is similar enough, otherwise
    /// runs the pipeline and remembers a non-empty result.
    ///
    /// `top_k` of `None` or `0` means the configured default.
    pub fn search(&self, query: &str, top_k: Option<usize>) -> SearchOutcome {
        if query.trim().is_empty() {
            return SearchOutcome::NoQuery;
        }

        let want = top_k
            .filter(|k| *k > 0)
            .unwrap_or(self.default_top_k);
        let _span = tracing::info_span!("search", want).entered();

        let vector = match self.embedder.embed(query) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("embedding failed, bypassing cache: {e}");
                None
            }
        };

        if let Some(vector) = &vector {
            if let Some(cards) = self.lookup(vector, want) {
                return SearchOutcome::Cards(cards);
            }
        }

        let cards = self.pipeline.run(query, want);
        if cards.is_empty() {
            return SearchOutcome::NoResults;
        }

        if let Some(vector) = &vector {
            match self.cache.add(query, vector, &cards) {
                Ok(()) => log::debug!("cache stored query={query:?} cards={}", cards.len()),
                Err(e) => log::warn!("cache write failed, result not stored: {e}"),
            }
        }

        SearchOutcome::Cards(cards)
    }

    fn lookup(&self, vector: &[f32], want: usize) -> Option<Vec<Card>> {
        let hit = match self.cache.search(vector, 1) {
            Ok(hits) => hits.into_iter().next()?,
            Err(e) => {
                log::warn!("cache read failed, treating as miss: {e}");
                return None;
            }
        };

        if hit.similarity < self.threshold || hit.record.cards.is_empty() {
            log::debug!("cache miss best={:.3}", hit.similarity);
            return None;
        }

        log::info!(
            "cache hit similarity={:.3} stored_query={:?}",
            hit.similarity,
            hit.record.query
        );
        let mut cards = hit.record.cards;
        cards.truncate(want);
        Some(cards)
    }
}
