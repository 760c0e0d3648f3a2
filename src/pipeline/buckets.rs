use std::collections::HashMap;
use std::str::FromStr;

use crate::db::{BucketFilter, BucketRow};
use crate::error::MediaError;
use crate::models::CollectionSummary;

pub const CAMERA_BUCKET: &str = "Camera";
const UNNAMED_BUCKET: &str = "No Name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMode {
    /// Only the camera bucket.
    Roll,
    Smart,
    Albums,
    Moments,
}

impl FromStr for CollectionMode {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLL" => Ok(CollectionMode::Roll),
            "SMART" => Ok(CollectionMode::Smart),
            "ALBUMS" => Ok(CollectionMode::Albums),
            "MOMENTS" => Ok(CollectionMode::Moments),
            other => Err(MediaError::UnsupportedCollectionMode(other.to_string())),
        }
    }
}

impl CollectionMode {
    /// Mode named by the caller; ROLL when none is given.
    pub fn resolve(requested: Option<&str>) -> Result<Self, MediaError> {
        requested.map_or(Ok(CollectionMode::Roll), |m| m.parse())
    }

    pub fn bucket_filter(self) -> BucketFilter {
        match self {
            CollectionMode::Roll => BucketFilter::DisplayName(CAMERA_BUCKET.to_string()),
            CollectionMode::Smart | CollectionMode::Albums | CollectionMode::Moments => BucketFilter::All,
        }
    }
}

/// Folds per-item bucket rows into one summary per bucket, in first-seen
/// order. Bucket ids compare case-insensitively; the first row's id and name
/// are the ones kept.
#[derive(Debug, Default)]
pub struct BucketAggregator {
    seen: HashMap<String, usize>,
    summaries: Vec<CollectionSummary>,
}

impl BucketAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: BucketRow) {
        let key = row.bucket_id.to_lowercase();
        if let Some(&idx) = self.seen.get(&key) {
            self.summaries[idx].item_count += 1;
            return;
        }
        self.seen.insert(key, self.summaries.len());
        self.summaries.push(CollectionSummary {
            id: row.bucket_id,
            name: row.bucket_name.unwrap_or_else(|| UNNAMED_BUCKET.to_string()),
            item_count: 1,
        });
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn finish(self) -> Vec<CollectionSummary> {
        self.summaries
    }
}

pub fn aggregate<I: IntoIterator<Item = BucketRow>>(rows: I) -> Vec<CollectionSummary> {
    let mut agg = BucketAggregator::new();
    for row in rows {
        agg.push(row);
    }
    agg.finish()
}
