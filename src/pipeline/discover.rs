//! Filesystem scanner that fills the media index.
//!
//! Every image or video under the root becomes one row; its parent directory
//! is its bucket. Rows for files that disappeared are pruned afterwards.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

use crate::db::writer::{self, IndexEntry};
use crate::db::DbPool;
use crate::models::MediaType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub indexed: usize,
    pub pruned: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    mime: String,
    media_type: MediaType,
    mtime_ms: i64,
}

fn is_hidden(p: &Path) -> bool {
    p.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn classify(path: &Path) -> Option<(MediaType, String)> {
    let mime = mime_guess::from_path(path).first()?.essence_str().to_string();
    if mime.starts_with("image/") {
        Some((MediaType::Photo, mime))
    } else if mime.starts_with("video/") {
        Some((MediaType::Video, mime))
    } else {
        None
    }
}

/// Decimal xxh3 of the lower-cased parent directory.
pub fn bucket_id_for(dir: &Path) -> String {
    xxh3_64(dir.to_string_lossy().to_lowercase().as_bytes()).to_string()
}

/// Maps the EXIF orientation tag to clockwise degrees. Mirrored variants
/// have no rotation-only equivalent and are left out.
pub fn exif_rotation(tag: u32) -> Option<&'static str> {
    match tag {
        3 => Some("180"),
        6 => Some("90"),
        8 => Some("270"),
        _ => None,
    }
}

fn read_exif_rotation(path: &Path) -> Option<&'static str> {
    let file = fs::File::open(path).ok()?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    exif_rotation(field.value.get_uint(0)?)
}

fn collect_candidates(root: &Path) -> (Vec<Candidate>, usize) {
    let mut out = Vec::new();
    let mut skipped = 0;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("walk error under {:?}: {}", root, e);
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some((media_type, mime)) = classify(entry.path()) else {
            continue;
        };
        let mtime_ms = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        out.push(Candidate { path: entry.into_path(), mime, media_type, mtime_ms });
    }
    (out, skipped)
}

fn base_entry(c: &Candidate) -> IndexEntry {
    let parent = c.path.parent().unwrap_or_else(|| Path::new(""));
    IndexEntry {
        path: c.path.to_string_lossy().to_string(),
        media_type: c.media_type,
        title: c.path.file_stem().and_then(|s| s.to_str()).map(str::to_string),
        mime: Some(c.mime.clone()),
        date_taken: Some(c.mtime_ms),
        bucket_id: bucket_id_for(parent),
        bucket_display_name: parent.file_name().and_then(|s| s.to_str()).map(str::to_string),
        ..Default::default()
    }
}

fn photo_entry(c: &Candidate) -> IndexEntry {
    let mut entry = base_entry(c);
    match image::image_dimensions(&c.path) {
        Ok((w, h)) => {
            entry.width = Some(w as i64);
            entry.height = Some(h as i64);
        }
        Err(e) => debug!("no dimensions for {:?}: {}", c.path, e),
    }
    entry.orientation = read_exif_rotation(&c.path).map(str::to_string);
    entry
}

fn parse_duration_ms(v: &Value) -> Option<i64> {
    if let Some(s) = v.as_str() {
        if let Ok(f) = s.parse::<f64>() {
            return Some((f * 1000.0) as i64);
        }
    }
    v.as_f64().map(|n| (n * 1000.0) as i64)
}

/// Width, height and duration from ffprobe's JSON. All `None` when ffprobe
/// is missing or fails.
pub fn parse_probe(stdout: &[u8]) -> (Option<i64>, Option<i64>, Option<i64>) {
    let Ok(v) = serde_json::from_slice::<Value>(stdout) else {
        return (None, None, None);
    };
    let video = v
        .get("streams")
        .and_then(|x| x.as_array())
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.get("codec_type").and_then(|x| x.as_str()) == Some("video"))
        });
    let w = video.and_then(|s| s.get("width")).and_then(|x| x.as_i64());
    let h = video.and_then(|s| s.get("height")).and_then(|x| x.as_i64());
    let dur = v.get("format").and_then(|f| f.get("duration")).and_then(parse_duration_ms);
    (w, h, dur)
}

async fn probe_video(path: &Path) -> (Option<i64>, Option<i64>, Option<i64>) {
    let path = path.to_string_lossy();
    let args = ["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format", path.as_ref()];
    match crate::utils::exec::exec_capture("ffprobe", &args).await {
        Ok((0, stdout, _)) => parse_probe(&stdout),
        Ok((code, _, _)) => {
            debug!("ffprobe exited with {} for {}", code, path);
            (None, None, None)
        }
        Err(e) => {
            debug!("ffprobe unavailable for {}: {}", path, e);
            (None, None, None)
        }
    }
}

/// Scans `root` into the index behind `pool` and prunes rows whose files
/// are gone.
pub async fn index_root(root: &Path, pool: &DbPool) -> Result<ScanSummary> {
    if !root.is_dir() {
        anyhow::bail!("media root {:?} is not a directory", root);
    }
    info!("scanning {:?}", root);
    let walk_root = root.to_path_buf();
    let (candidates, skipped) = tokio::task::spawn_blocking(move || collect_candidates(&walk_root))
        .await
        .context("scan worker failed")?;

    let (photos, videos): (Vec<Candidate>, Vec<Candidate>) =
        candidates.into_iter().partition(|c| c.media_type == MediaType::Photo);

    let mut entries = tokio::task::spawn_blocking(move || photos.iter().map(photo_entry).collect::<Vec<_>>())
        .await
        .context("photo metadata worker failed")?;
    for c in &videos {
        let mut entry = base_entry(c);
        let (w, h, dur) = probe_video(&c.path).await;
        entry.width = w;
        entry.height = h;
        entry.duration_ms = dur;
        entries.push(entry);
    }

    let pool = pool.clone();
    let (indexed, pruned) = tokio::task::spawn_blocking(move || -> Result<(usize, usize)> {
        let mut conn = pool.get()?;
        let ids = writer::write_entries(&mut conn, &entries)?;
        let pruned = writer::prune_missing(&mut conn)?;
        Ok((ids.len(), pruned))
    })
    .await
    .context("index writer failed")??;

    let summary = ScanSummary { indexed, pruned, skipped };
    info!("scan of {:?} done: {:?}", root, summary);
    Ok(summary)
}
