#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use nazr_media_bridge::db::writer::{write_entries, IndexEntry};
use nazr_media_bridge::db::{self, DbPool, SqliteIndex};
use nazr_media_bridge::error::MediaResult;
use nazr_media_bridge::models::MediaType;
use nazr_media_bridge::permission::{AuthorizationStatus, StaticPermissionGate};
use nazr_media_bridge::pipeline::codec::{ImageCodec, RasterCodec};
use nazr_media_bridge::pipeline::export::CacheDirExport;
use nazr_media_bridge::PhotoLibrary;
use tempfile::TempDir;

/// Create a temporary SQLite index for testing
pub fn setup_test_db() -> (TempDir, PathBuf, DbPool) {
    setup_test_db_with_pool_size(4)
}

pub fn setup_test_db_with_pool_size(size: u32) -> (TempDir, PathBuf, DbPool) {
    let tmp = TempDir::new().unwrap();
    let db_dir = tmp.path().join("db");
    std::fs::create_dir_all(&db_dir).unwrap();
    let db_path = db_dir.join("media.db");
    let pool = db::create_pool(&db_path, size).unwrap();
    (tmp, db_path, pool)
}

pub fn seed(pool: &DbPool, entries: &[IndexEntry]) -> Vec<i64> {
    let mut conn = pool.get().unwrap();
    write_entries(&mut conn, entries).unwrap()
}

pub fn photo(path: &str, bucket_id: &str, bucket_name: &str, date_taken: i64) -> IndexEntry {
    IndexEntry {
        path: path.to_string(),
        media_type: MediaType::Photo,
        title: Path::new(path).file_stem().and_then(|s| s.to_str()).map(str::to_string),
        date_taken: Some(date_taken),
        width: Some(400),
        height: Some(300),
        bucket_id: bucket_id.to_string(),
        bucket_display_name: Some(bucket_name.to_string()),
        ..Default::default()
    }
}

pub fn video(path: &str, bucket_id: &str, bucket_name: &str, date_taken: i64) -> IndexEntry {
    IndexEntry {
        media_type: MediaType::Video,
        duration_ms: Some(4_000),
        ..photo(path, bucket_id, bucket_name, date_taken)
    }
}

/// `n` photos in one bucket, newest first by insertion index.
pub fn seed_photos(pool: &DbPool, n: usize) -> Vec<i64> {
    let entries: Vec<IndexEntry> = (0..n)
        .map(|i| photo(&format!("/photos/Camera/img{:03}.jpg", i), "1", "Camera", 1_000_000 + i as i64))
        .collect();
    seed(pool, &entries)
}

/// Write a solid-color PNG of the given size.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).unwrap();
    }
    DynamicImage::new_rgb8(width, height).save(path).unwrap();
}

pub fn library_with(pool: DbPool, data: &Path, codec: Arc<dyn RasterCodec>, access: AuthorizationStatus) -> PhotoLibrary {
    PhotoLibrary::new(
        Arc::new(SqliteIndex::new(pool)),
        codec,
        Arc::new(StaticPermissionGate::new(access)),
        Arc::new(CacheDirExport::new(data.join("exports"))),
    )
}

pub fn test_library(pool: DbPool, data: &Path) -> PhotoLibrary {
    library_with(pool, data, Arc::new(ImageCodec::new()), AuthorizationStatus::Granted)
}

/// Codec that counts which source each decode came from.
#[derive(Default)]
pub struct CountingCodec {
    inner: ImageCodec,
    pub full: AtomicUsize,
    pub thumbnails: AtomicUsize,
}

impl CountingCodec {
    pub fn full_decodes(&self) -> usize {
        self.full.load(Ordering::SeqCst)
    }

    pub fn thumbnail_decodes(&self) -> usize {
        self.thumbnails.load(Ordering::SeqCst)
    }
}

impl RasterCodec for CountingCodec {
    fn decode(&self, locator: &Path) -> MediaResult<DynamicImage> {
        self.full.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(locator)
    }

    fn decode_thumbnail(&self, locator: &Path) -> MediaResult<DynamicImage> {
        self.thumbnails.fetch_add(1, Ordering::SeqCst);
        self.inner.decode_thumbnail(locator)
    }
}
