use std::sync::Mutex;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use regex::Regex;

use crate::card::{compose_address, Card, CardMetadata, CardParts};
use crate::catalog::{ListQuery, RawItem, TourismCatalogClient};
use crate::config::RecommendConfig;
use crate::images::{to_https, ImageResolutionCache, ImageValidator};
use crate::recommend::{RegionCategoryExtractor, Summarizer};

/// Titles of chain stores, branches and outlets; not destinations.
static COMMERCIAL_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(대리점|지점|점$|마트|백화점|면세점|아울렛|할인점|스토어)").unwrap()
});

/// Characters of the overview used as the reason when no summary exists
const OVERVIEW_REASON_CHARS: usize = 120;

/// Query -> region/category -> listing -> clean -> sample -> enrich -> cards.
pub struct RecommendationPipeline {
    config: RecommendConfig,
    extractor: RegionCategoryExtractor,
    summarizer: Summarizer,
    catalog: TourismCatalogClient,
    validator: ImageValidator,
    images: ImageResolutionCache,
    rng: Mutex<StdRng>,
    pool: Option<rayon::ThreadPool>,
}

impl RecommendationPipeline {
    pub fn new(
        config: RecommendConfig,
        extractor: RegionCategoryExtractor,
        summarizer: Summarizer,
        catalog: TourismCatalogClient,
        validator: ImageValidator,
        images: ImageResolutionCache,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let pool = if config.enrich_workers > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.enrich_workers)
                .thread_name(|i| format!("enrich-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    log::warn!("failed to start enrichment pool, enriching sequentially: {e}");
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            extractor,
            summarizer,
            catalog,
            validator,
            images,
            rng: Mutex::new(rng),
            pool,
        }
    }

    /// At most `want` cards (`0` means the configured default), in sampled
    /// order. Empty when the cleaned listing has nothing left.
    pub fn run(&self, query: &str, want: usize) -> Vec<Card> {
        let want = if want == 0 {
            self.config.num_recommend
        } else {
            want
        };

        let extraction = self.extractor.extract(query);
        log::info!(
            "extracted region={} category={}",
            extraction.region,
            extraction
                .category
                .map(|c| c.code())
                .unwrap_or("-")
        );

        let area_code = self.catalog.resolve_area_code(&extraction.region);
        let sigungu_code = area_code
            .as_deref()
            .and_then(|area| self.catalog.resolve_sigungu_code(area, &extraction.region));

        let items = self.catalog.list_by_area(&ListQuery {
            area_code: area_code.as_deref(),
            sigungu_code: sigungu_code.as_deref(),
            category: extraction.category,
            count: self.fetch_count(want),
        });

        let fetched = items.len();
        let items = clean_items(items);
        log::debug!("listing fetched={fetched} kept={}", items.len());

        if items.is_empty() {
            log::info!("no candidates left for region={}", extraction.region);
            return Vec::new();
        }

        let sampled = self.sample(items, want);
        let region = extraction.region.as_str();

        let mut cards: Vec<Card> = match &self.pool {
            Some(pool) => pool.install(|| {
                sampled
                    .par_iter()
                    .map(|item| self.enrich(item, region))
                    .collect()
            }),
            None => sampled
                .iter()
                .map(|item| self.enrich(item, region))
                .collect(),
        };

        cards.truncate(want);
        cards
    }

    fn fetch_count(&self, want: usize) -> usize {
        self.config
            .min_fetch
            .max(want.saturating_mul(self.config.fetch_multiplier))
    }

    /// Uniform sample without replacement, in random order.
    fn sample(&self, mut items: Vec<RawItem>, want: usize) -> Vec<RawItem> {
        let amount = want.min(items.len());
        let indices = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rand::seq::index::sample(&mut *rng, items.len(), amount)
        };

        let mut slots: Vec<Option<RawItem>> = items.drain(..).map(Some).collect();
        indices
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect()
    }

    /// Detail, summary and image for one item. Steps not started before the
    /// item's budget runs out are skipped and their fields left to defaults.
    fn enrich(&self, item: &RawItem, region: &str) -> Card {
        // a budget too large to represent means no deadline
        let deadline =
            Instant::now().checked_add(Duration::from_secs(self.config.item_budget_secs));
        let in_budget = || deadline.map_or(true, |d| Instant::now() < d);

        let content_id = item.contentid.trim();
        let title = strip_bold(&item.title);

        let detail = if in_budget() {
            self.catalog.fetch_detail(content_id)
        } else {
            Default::default()
        };

        let summary = if in_budget() {
            self.summarizer.summarize(&detail.overview)
        } else {
            String::new()
        };
        let reason = if !summary.is_empty() {
            summary
        } else if !detail.overview.is_empty() {
            let head: String = detail.overview.chars().take(OVERVIEW_REASON_CHARS).collect();
            format!("{head}...")
        } else {
            String::new()
        };

        let image_url = self.resolve_image(
            content_id,
            &[item.firstimage2.as_str(), item.firstimage.as_str()],
            deadline,
        );

        if !in_budget() {
            log::warn!("contentid={content_id} exceeded item budget, using partial card");
        }

        Card::assemble(CardParts {
            name: title.clone(),
            reason,
            address: compose_address(&item.addr1, &item.addr2),
            image_url,
            homepage: detail.homepage,
            metadata: CardMetadata {
                contentid: content_id.to_string(),
                cat1: item.cat1.clone(),
                addr1: item.addr1.clone(),
                firstimage2: item.firstimage2.clone(),
                title,
                region: region.to_string(),
            },
        })
    }

    /// Cache, then each listing image, then the detail-image endpoint.
    /// Anything found outside the cache is written back to it.
    fn resolve_image(&self, content_id: &str, candidates: &[&str], deadline: Option<Instant>) -> String {
        let cached = self.images.get(content_id);
        if !cached.is_empty() {
            return cached;
        }

        for raw in candidates {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return String::new();
            }
            let valid = self.validator.validate(&to_https(raw));
            if !valid.is_empty() {
                self.images.set(content_id, &valid);
                return valid;
            }
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            return String::new();
        }

        let url = self.catalog.fetch_detail_image(content_id, &self.validator);
        if !url.is_empty() {
            self.images.set(content_id, &url);
        }
        url
    }
}

/// Drops untitled entries and commercial listings.
pub fn clean_items(items: Vec<RawItem>) -> Vec<RawItem> {
    items
        .into_iter()
        .filter(|item| {
            let title = item.title.trim();
            !title.is_empty() && !COMMERCIAL_TITLE.is_match(title)
        })
        .collect()
}

fn strip_bold(title: &str) -> String {
    title.replace("<b>", "").replace("</b>", "").trim().to_string()
}
