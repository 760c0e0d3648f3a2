use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{MediaError, MediaResult};

const DEFAULT_VIDEO_EXT: &str = "mp4";

/// Result of a video export, as handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoExport {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
}

impl VideoExport {
    pub fn complete(uri: String) -> Self {
        Self { kind: "download_complete".to_string(), uri }
    }
}

/// Copies a stored media file somewhere the caller can read it and returns
/// a URI for the copy.
pub trait ExportSink: Send + Sync {
    fn export(&self, source: &Path) -> MediaResult<String>;
}

/// Exports into a fixed directory as `video_<random>.<ext>`.
#[derive(Debug, Clone)]
pub struct CacheDirExport {
    dir: PathBuf,
}

impl CacheDirExport {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl ExportSink for CacheDirExport {
    fn export(&self, source: &Path) -> MediaResult<String> {
        let fail = |e: std::io::Error| MediaError::ExportFailed(format!("{}: {}", source.display(), e));

        let mut input = File::open(source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::NotFound(source.display().to_string()),
            _ => fail(e),
        })?;
        std::fs::create_dir_all(&self.dir).map_err(fail)?;

        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_VIDEO_EXT)
            .to_lowercase();
        let mut out = tempfile::Builder::new()
            .prefix("video_")
            .suffix(&format!(".{}", ext))
            .tempfile_in(&self.dir)
            .map_err(fail)?;
        let copied = std::io::copy(&mut input, out.as_file_mut()).map_err(fail)?;

        // An error here drops the temp file, which removes the partial copy.
        let (_, kept) = out.keep().map_err(|e| fail(e.error))?;
        let abs = kept.canonicalize().unwrap_or(kept);
        info!("exported {} ({} bytes) to {}", source.display(), copied, abs.display());
        Ok(format!("file://{}", abs.display()))
    }
}
