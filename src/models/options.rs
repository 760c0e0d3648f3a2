use serde::Deserialize;

pub const DEFAULT_THUMB_SIZE: u32 = 120;
pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_DOWNLOAD_WIDTH: u32 = 500;
pub const DEFAULT_DOWNLOAD_HEIGHT: u32 = 500;
pub const DEFAULT_INTERVAL_MS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectionOptions {
    pub collection_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOptions {
    pub offset: i64,
    pub limit: i64,
    pub interval: i64,
    pub batch_size: Option<i64>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self { offset: 0, limit: 0, interval: DEFAULT_INTERVAL_MS as i64, batch_size: None }
    }
}

impl ListOptions {
    pub fn offset(&self) -> usize {
        self.offset.max(0) as usize
    }

    /// 0 means no cap.
    pub fn limit(&self) -> usize {
        self.limit.max(0) as usize
    }

    pub fn interval_ms(&self) -> u64 {
        if self.interval < 0 {
            DEFAULT_INTERVAL_MS
        } else {
            self.interval as u64
        }
    }

    /// Rows per intermediate delivery. Falls back to the limit, or to a single
    /// final delivery when there is no limit either.
    pub fn batch_size(&self) -> usize {
        match self.batch_size {
            Some(n) if n > 0 => n as usize,
            _ if self.limit > 0 => self.limit as usize,
            _ => usize::MAX,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThumbnailOptions {
    pub dimension: u32,
    pub quality: i64,
    pub as_data_url: bool,
    pub orientation: Option<i32>,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_THUMB_SIZE,
            quality: DEFAULT_QUALITY as i64,
            as_data_url: false,
            orientation: None,
        }
    }
}

/// Options for a full image. With `dimension` set the image is scaled
/// proportionally; otherwise it is bounded by the download box.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageOptions {
    pub dimension: Option<u32>,
    pub quality: i64,
    pub as_data_url: bool,
    pub orientation: Option<i32>,
    #[serde(rename = "download_width")]
    pub download_width: u32,
    #[serde(rename = "download_height")]
    pub download_height: u32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            dimension: None,
            quality: DEFAULT_QUALITY as i64,
            as_data_url: false,
            orientation: None,
            download_width: DEFAULT_DOWNLOAD_WIDTH,
            download_height: DEFAULT_DOWNLOAD_HEIGHT,
        }
    }
}

/// Clamp a caller quality into what the JPEG encoder accepts.
pub fn clamp_quality(q: i64) -> u8 {
    q.clamp(1, 100) as u8
}
