/// Thumbnail module
///
/// This module handles:
/// - Generating and caching scaled copies of images on disk (cache.rs)
/// - A bounded in-memory cache for decoded images (memory.rs)

pub mod cache;
pub mod memory;

pub use cache::ThumbnailCache;
pub use memory::ImageCache;

/// Name of the thumbnail directory inside the images base
pub const CACHE_DIR_NAME: &str = ".thumb_cache";
