use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{MediaError, MediaResult};
use crate::pipeline::transform::encode_jpeg;

/// Long edge of the low-resolution source used for small thumbnails.
pub const THUMBNAIL_SOURCE_MAX: u32 = 512;
const THUMBNAIL_CACHE_QUALITY: u8 = 90;

/// Turns a storage locator into a decoded raster.
pub trait RasterCodec: Send + Sync {
    fn decode(&self, locator: &Path) -> MediaResult<DynamicImage>;

    /// A reduced version of the image, capped at [`THUMBNAIL_SOURCE_MAX`].
    /// Images already within the cap come back unchanged.
    fn decode_thumbnail(&self, locator: &Path) -> MediaResult<DynamicImage>;
}

/// Codec over local files using the `image` crate, with an optional on-disk
/// cache for thumbnail sources.
#[derive(Clone, Debug, Default)]
pub struct ImageCodec {
    derived: Option<PathBuf>,
}

impl ImageCodec {
    pub fn new() -> Self {
        Self { derived: None }
    }

    pub fn with_cache(derived: PathBuf) -> Self {
        Self { derived: Some(derived) }
    }

    fn cache_path(&self, locator: &Path) -> Option<PathBuf> {
        let derived = self.derived.as_ref()?;
        let key = format!("{:016x}", xxh3_64(locator.to_string_lossy().as_bytes()));
        Some(derived.join(&key[0..2]).join(format!("{}-{}.jpg", key, THUMBNAIL_SOURCE_MAX)))
    }

    fn cached(&self, locator: &Path, cache: &Path) -> Option<DynamicImage> {
        let src_mtime = std::fs::metadata(locator).and_then(|m| m.modified()).ok()?;
        let cache_mtime = std::fs::metadata(cache).and_then(|m| m.modified()).ok()?;
        if cache_mtime < src_mtime {
            return None;
        }
        image::open(cache).ok()
    }

    fn store(&self, cache: &Path, img: &DynamicImage) {
        let write_result = cache
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .map_err(|e| e.to_string())
            .and_then(|_| encode_jpeg(img, THUMBNAIL_CACHE_QUALITY).map_err(|e| e.to_string()))
            .and_then(|bytes| std::fs::write(cache, bytes).map_err(|e| e.to_string()));

        if let Err(e) = write_result {
            warn!("Failed to cache thumbnail source {:?}: {}", cache, e);
            if cache.exists() {
                if let Err(rm_err) = std::fs::remove_file(cache) {
                    warn!("Failed to clean up partial thumbnail file {:?}: {}", cache, rm_err);
                }
            }
        }
    }
}

impl RasterCodec for ImageCodec {
    fn decode(&self, locator: &Path) -> MediaResult<DynamicImage> {
        if !locator.exists() {
            return Err(MediaError::NotFound(locator.display().to_string()));
        }
        image::open(locator)
            .map_err(|e| MediaError::TransformFailed(format!("Failed to decode image {}: {}", locator.display(), e)))
    }

    fn decode_thumbnail(&self, locator: &Path) -> MediaResult<DynamicImage> {
        let cache = self.cache_path(locator);
        if let Some(img) = cache.as_deref().and_then(|c| self.cached(locator, c)) {
            debug!("thumbnail source cache hit for {:?}", locator);
            return Ok(img);
        }
        let full = self.decode(locator)?;
        if full.width().max(full.height()) <= THUMBNAIL_SOURCE_MAX {
            return Ok(full);
        }
        let thumb = full.thumbnail(THUMBNAIL_SOURCE_MAX, THUMBNAIL_SOURCE_MAX);
        if let Some(cache) = cache {
            self.store(&cache, &thumb);
        }
        Ok(thumb)
    }
}
