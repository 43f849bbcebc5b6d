pub mod cache;
pub mod validation;

pub use cache::ImageResolutionCache;
pub use validation::{to_https, ImageValidator};
