use tracing::debug;

use crate::db::MediaIndex;
use crate::error::{MediaError, MediaResult};
use crate::models::options::clamp_quality;
use crate::models::{ImageOptions, MediaType, ThumbnailOptions};
use crate::pipeline::codec::RasterCodec;
use crate::pipeline::transform::{transform, ImageOutput, Rotation, Sizing};

/// Requested sizes at or above this go to the full-resolution source; the
/// thumbnail source is too small to serve them well.
pub const FULL_RESOLUTION_THRESHOLD: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Thumbnail,
    FullResolution,
}

impl SourceKind {
    pub fn route(dimension: u32) -> Self {
        if dimension >= FULL_RESOLUTION_THRESHOLD {
            SourceKind::FullResolution
        } else {
            SourceKind::Thumbnail
        }
    }
}

/// Explicit override, else the stored value, else 0.
pub fn resolve_orientation(requested: Option<i32>, stored: Option<&str>) -> i32 {
    requested
        .or_else(|| stored.and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub source: SourceKind,
    pub sizing: Sizing,
    pub orientation: Option<i32>,
    pub quality: u8,
    pub as_data_url: bool,
}

impl RenderRequest {
    pub fn thumbnail(opts: &ThumbnailOptions) -> Self {
        Self {
            source: SourceKind::route(opts.dimension),
            sizing: Sizing::Proportional { target: opts.dimension },
            orientation: opts.orientation,
            quality: clamp_quality(opts.quality),
            as_data_url: opts.as_data_url,
        }
    }

    /// With a dimension the image is scaled proportionally like a thumbnail;
    /// without one it is capped to the download box from the full source.
    pub fn image(opts: &ImageOptions) -> Self {
        let (source, sizing) = match opts.dimension {
            Some(target) => (SourceKind::route(target), Sizing::Proportional { target }),
            None => (
                SourceKind::FullResolution,
                Sizing::Bounded { width: opts.download_width, height: opts.download_height },
            ),
        };
        Self {
            source,
            sizing,
            orientation: opts.orientation,
            quality: clamp_quality(opts.quality),
            as_data_url: opts.as_data_url,
        }
    }
}

/// Locates a photo, decodes it from the routed source and runs the transform.
/// Blocking; callers run it off the async runtime.
pub fn render(
    index: &dyn MediaIndex,
    codec: &dyn RasterCodec,
    id: &str,
    req: &RenderRequest,
) -> MediaResult<ImageOutput> {
    let location = index
        .locate(MediaType::Photo, id)
        .map_err(MediaError::source_query)?
        .ok_or_else(|| MediaError::NotFound(id.to_string()))?;

    let degrees = resolve_orientation(req.orientation, location.orientation.as_deref());
    let rotation = Rotation::from_degrees(degrees)?;
    debug!(
        "render id={} source={:?} sizing={:?} rotation={:?} quality={}",
        id, req.source, req.sizing, rotation, req.quality
    );

    let raster = match req.source {
        SourceKind::Thumbnail => codec.decode_thumbnail(&location.path)?,
        SourceKind::FullResolution => codec.decode(&location.path)?,
    };
    let bytes = transform(&raster, req.sizing, rotation, req.quality)?;
    Ok(ImageOutput::new(bytes, req.as_data_url))
}
