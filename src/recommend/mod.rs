mod category;
mod extractor;
mod pipeline;
mod summary;

pub use category::Category;
pub use extractor::RegionCategoryExtractor;
pub use pipeline::RecommendationPipeline;
pub use summary::Summarizer;
