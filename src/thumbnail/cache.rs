/// Scaled copies of resolved images
///
/// Thumbnails live in `<images_base>/.thumb_cache/` under the MD5 of
/// `"<relative path>|<edge>"`, so the same image at the same size always maps
/// to the same file and no index is needed. A thumbnail is rebuilt whenever
/// its source is newer than it.
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use md5::{Digest, Md5};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use super::CACHE_DIR_NAME;
use crate::error::{Result, ReviewError};
use crate::store::document::write_temp;

#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    images_base: PathBuf,
    cache_dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(images_base: impl Into<PathBuf>) -> Self {
        let images_base = images_base.into();
        let cache_dir = images_base.join(CACHE_DIR_NAME);
        Self {
            images_base,
            cache_dir,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the thumbnail of `source` at `edge` pixels is kept
    pub fn cache_path(&self, source: &Path, edge: u32) -> PathBuf {
        let rel = relative_to(source, &self.images_base);
        let key = format!("{}|{}", rel.to_string_lossy(), edge);
        let digest = Md5::digest(key.as_bytes());
        self.cache_dir.join(format!("{}.png", hex::encode(digest)))
    }

    /// Path of a thumbnail no larger than `edge` on its long side.
    ///
    /// Falls back to `source` itself if the image cannot be read or the
    /// thumbnail cannot be written.
    pub fn ensure(&self, source: &Path, edge: u32) -> PathBuf {
        let thumb = self.cache_path(source, edge);
        match self.ensure_inner(source, &thumb, edge) {
            Ok(path) => path,
            Err(e) => {
                warn!("Showing original image, no thumbnail: {}", e);
                source.to_path_buf()
            }
        }
    }

    /// [`ensure`](Self::ensure) on tokio's blocking pool
    pub async fn ensure_async(&self, source: PathBuf, edge: u32) -> PathBuf {
        let cache = self.clone();
        let fallback = source.clone();
        tokio::task::spawn_blocking(move || cache.ensure(&source, edge))
            .await
            .unwrap_or_else(|e| {
                warn!("{}", ReviewError::Task(e.to_string()));
                fallback
            })
    }

    fn ensure_inner(&self, source: &Path, thumb: &Path, edge: u32) -> Result<PathBuf> {
        let source_mtime = modified(source)?;
        if let Ok(thumb_mtime) = modified(thumb) {
            if thumb_mtime >= source_mtime {
                return Ok(thumb.to_path_buf());
            }
        }

        let img = image::open(source).map_err(|e| ReviewError::Image {
            path: source.to_path_buf(),
            source: e,
        })?;
        let scaled = scale_to_edge(img, edge);

        let mut png = std::io::Cursor::new(Vec::new());
        scaled
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| ReviewError::Image {
                path: thumb.to_path_buf(),
                source: e,
            })?;
        let tmp = write_temp(thumb, png.get_ref())?;
        fs::rename(&tmp, thumb).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ReviewError::io(thumb, e)
        })?;

        debug!(
            "Built {}x{} thumbnail for {}",
            scaled.width(),
            scaled.height(),
            source.display()
        );
        Ok(thumb.to_path_buf())
    }
}

/// `path` relative to `base`, stepping out with `..` when it lies elsewhere.
/// Paths with a different root are returned unchanged.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if let Ok(rel) = path.strip_prefix(base) {
        return rel.to_path_buf();
    }

    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    if path.first() != base.first() {
        return path.iter().collect();
    }

    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();
    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    rel.extend(&path[common..]);
    rel
}

/// Shrink so the long side is at most `edge`; never enlarge
pub fn scale_to_edge(img: DynamicImage, edge: u32) -> DynamicImage {
    let long_side = img.width().max(img.height());
    if edge == 0 || long_side <= edge {
        return img;
    }
    img.resize(edge, edge, FilterType::Lanczos3)
}

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| ReviewError::io(path, e))
}
