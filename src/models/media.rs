use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

const PHOTO_CONTENT_TYPE: &str = "image/jpeg";
const VIDEO_CONTENT_TYPE: &str = "video/mp4";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Photo,
    Video,
}

impl MediaType {
    /// Value stored in the `media_type` column of the index.
    pub fn code(self) -> i64 {
        match self {
            MediaType::Photo => 1,
            MediaType::Video => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(MediaType::Photo),
            3 => Some(MediaType::Video),
            _ => None,
        }
    }
}

/// One row of the media index, exactly as stored.
#[derive(Debug, Clone, Default)]
pub struct RawMediaRow {
    pub id: i64,
    pub media_type: MediaType,
    pub title: Option<String>,
    pub date_taken: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub orientation: Option<String>,
    pub duration_ms: Option<i64>,
    pub bucket_id: String,
    pub bucket_display_name: Option<String>,
    pub mime: Option<String>,
}

/// A photo or video as delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub width: i64,
    pub height: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

impl MediaRecord {
    pub fn from_row(row: RawMediaRow) -> Self {
        let timestamp = row.date_taken.filter(|ts| *ts != 0);
        let date = timestamp.and_then(format_local);

        // A missing coordinate reads as 0; 0/0 means "no geotag".
        let lat = row.latitude.unwrap_or(0.0);
        let lon = row.longitude.unwrap_or(0.0);
        let (latitude, longitude) = if lat != 0.0 || lon != 0.0 {
            (Some(lat), Some(lon))
        } else {
            (None, None)
        };

        let raw_w = row.width.unwrap_or(0);
        let raw_h = row.height.unwrap_or(0);

        match row.media_type {
            MediaType::Photo => {
                // Stored dimensions describe the unrotated sensor frame.
                let swapped = matches!(row.orientation.as_deref(), Some("90") | Some("270"));
                let (width, height) = if swapped { (raw_h, raw_w) } else { (raw_w, raw_h) };
                MediaRecord {
                    id: row.id.to_string(),
                    name: row.title.unwrap_or_default(),
                    media_type: MediaType::Photo,
                    content_type: row.mime.unwrap_or_else(|| PHOTO_CONTENT_TYPE.to_string()),
                    timestamp,
                    date,
                    width,
                    height,
                    orientation: Some(row.orientation.unwrap_or_else(|| "0".to_string())),
                    latitude,
                    longitude,
                    duration_ms: None,
                }
            }
            MediaType::Video => MediaRecord {
                id: row.id.to_string(),
                name: row.title.unwrap_or_default(),
                media_type: MediaType::Video,
                content_type: row.mime.unwrap_or_else(|| VIDEO_CONTENT_TYPE.to_string()),
                timestamp,
                date,
                width: raw_w,
                height: raw_h,
                orientation: None,
                latitude,
                longitude,
                duration_ms: Some(row.duration_ms.unwrap_or(0)),
            },
        }
    }
}

fn format_local(epoch_millis: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(epoch_millis)
        .single()
        .map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// A bucket with the number of indexed items that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "count")]
    pub item_count: u64,
}

/// One delivery on a list stream. The stream ends after the batch whose
/// `is_final` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBatch {
    pub items: Vec<MediaRecord>,
    pub is_final: bool,
}
