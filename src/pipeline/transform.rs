use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use std::io::Cursor;

use crate::error::{MediaError, MediaResult};

pub const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Largest output raster, in pixels. Proportional fit may upscale, so the
/// requested size alone does not bound the allocation.
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// How the decoded raster is sized before rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    /// Longest edge becomes `target`; may upscale.
    Proportional { target: u32 },
    /// Each axis is capped independently at the box or the source, whichever
    /// is smaller. Aspect ratio is not preserved when only one axis is capped.
    Bounded { width: u32, height: u32 },
}

impl Sizing {
    pub fn output_dimensions(&self, src_w: u32, src_h: u32) -> (u32, u32) {
        match *self {
            Sizing::Proportional { target } => {
                let ratio = target as f64 / src_w.max(src_h) as f64;
                let w = (src_w as f64 * ratio).round() as u32;
                let h = (src_h as f64 * ratio).round() as u32;
                (w.max(1), h.max(1))
            }
            Sizing::Bounded { width, height } => (width.min(src_w).max(1), height.min(src_h).max(1)),
        }
    }
}

/// Clockwise rotation applied after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> MediaResult<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(MediaError::TransformFailed(format!(
                "orientation must be a multiple of 90 degrees, got {}",
                other
            ))),
        }
    }

    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Rotation::None => img,
            Rotation::Cw90 => img.rotate90(),
            Rotation::Cw180 => img.rotate180(),
            Rotation::Cw270 => img.rotate270(),
        }
    }
}

/// Scale, rotate, and JPEG-encode a decoded raster.
pub fn transform(img: &DynamicImage, sizing: Sizing, rotation: Rotation, quality: u8) -> MediaResult<Vec<u8>> {
    let (src_w, src_h) = (img.width(), img.height());
    if src_w == 0 || src_h == 0 {
        return Err(MediaError::TransformFailed("source image has no pixels".to_string()));
    }
    let (w, h) = sizing.output_dimensions(src_w, src_h);
    if w as u64 * h as u64 > MAX_OUTPUT_PIXELS {
        return Err(MediaError::TransformFailed(format!(
            "output of {}x{} exceeds {} pixels",
            w, h, MAX_OUTPUT_PIXELS
        )));
    }
    let scaled = if (w, h) == (src_w, src_h) {
        img.clone()
    } else {
        img.resize_exact(w, h, FilterType::Triangle)
    };
    encode_jpeg(&rotation.apply(scaled), quality)
}

/// `quality` must already be in 1..=100; request paths pass it through
/// `clamp_quality`.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> MediaResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| MediaError::TransformFailed(format!("JPEG encode failed: {}", e)))?;
    }
    Ok(buf.into_inner())
}

/// Encoded image as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    Bytes(Vec<u8>),
    DataUrl(String),
}

impl ImageOutput {
    pub fn new(bytes: Vec<u8>, as_data_url: bool) -> Self {
        if as_data_url {
            ImageOutput::DataUrl(format!("{}{}", DATA_URL_PREFIX, general_purpose::STANDARD.encode(&bytes)))
        } else {
            ImageOutput::Bytes(bytes)
        }
    }

    /// Raw JPEG bytes, decoding the data URL form if needed.
    pub fn to_bytes(&self) -> MediaResult<Vec<u8>> {
        match self {
            ImageOutput::Bytes(b) => Ok(b.clone()),
            ImageOutput::DataUrl(s) => {
                let payload = s.strip_prefix(DATA_URL_PREFIX).unwrap_or(s);
                general_purpose::STANDARD.decode(payload).map_err(MediaError::transform)
            }
        }
    }
}
