pub mod media;
pub mod options;

pub use media::{CollectionSummary, MediaBatch, MediaRecord, MediaType, RawMediaRow};
pub use options::{CollectionOptions, ImageOptions, ListOptions, ThumbnailOptions};
