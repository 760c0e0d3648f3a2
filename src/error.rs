use thiserror::Error;

/// Errors reported to the caller of a library operation.
///
/// Every error is terminal for the request that raised it. Nothing in the
/// library retries on its own.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Read external storage permission required")]
    PermissionDenied,

    #[error("Unsupported collection mode: {0}")]
    UnsupportedCollectionMode(String),

    #[error("Fetching of photo assets is in progress")]
    SessionBusy,

    #[error("Photo ID is undefined")]
    InvalidIdentifier,

    #[error("Photo with specified ID wasn't found: {0}")]
    NotFound(String),

    #[error("image transform failed: {0}")]
    TransformFailed(String),

    #[error("media index query failed: {0}")]
    SourceQueryFailed(String),

    #[error("export failed: {0}")]
    ExportFailed(String),
}

impl MediaError {
    pub fn source_query(err: impl std::fmt::Display) -> Self {
        MediaError::SourceQueryFailed(err.to_string())
    }

    pub fn transform(err: impl std::fmt::Display) -> Self {
        MediaError::TransformFailed(err.to_string())
    }
}

pub type MediaResult<T> = std::result::Result<T, MediaError>;

/// Rejects the identifiers callers send when they have nothing to send.
pub fn validate_id(id: Option<&str>) -> MediaResult<&str> {
    match id {
        Some(id) if !id.is_empty() && !id.eq_ignore_ascii_case("null") => Ok(id),
        _ => Err(MediaError::InvalidIdentifier),
    }
}
