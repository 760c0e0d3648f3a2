//! The caller-facing facade over the media index, codec and session gate.

use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{MediaIndex, MediaQuery};
use crate::error::{validate_id, MediaError, MediaResult};
use crate::models::{
    CollectionOptions, CollectionSummary, ImageOptions, ListOptions, MediaType, ThumbnailOptions,
};
use crate::permission::{AuthorizationStatus, PermissionGate};
use crate::pipeline::buckets::CollectionMode;
use crate::pipeline::codec::RasterCodec;
use crate::pipeline::export::{ExportSink, VideoExport};
use crate::pipeline::router::{render, RenderRequest};
use crate::pipeline::session::{self, MediaStream, SessionGate, SessionGuard, SessionState, WalkPlan};
use crate::pipeline::transform::ImageOutput;

#[derive(Clone)]
pub struct PhotoLibrary {
    index: Arc<dyn MediaIndex>,
    codec: Arc<dyn RasterCodec>,
    permissions: Arc<dyn PermissionGate>,
    exports: Arc<dyn ExportSink>,
    session: Arc<SessionGate>,
}

fn worker_failed(e: tokio::task::JoinError) -> MediaError {
    MediaError::TransformFailed(format!("worker task failed: {}", e))
}

impl PhotoLibrary {
    pub fn new(
        index: Arc<dyn MediaIndex>,
        codec: Arc<dyn RasterCodec>,
        permissions: Arc<dyn PermissionGate>,
        exports: Arc<dyn ExportSink>,
    ) -> Self {
        Self { index, codec, permissions, exports, session: SessionGate::new() }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.permissions.status()
    }

    pub async fn request_authorization(&self) -> AuthorizationStatus {
        self.permissions.request_read_access().await
    }

    async fn ensure_read_access(&self) -> MediaResult<()> {
        if self.permissions.has_read_access() {
            return Ok(());
        }
        match self.permissions.request_read_access().await {
            AuthorizationStatus::Granted => Ok(()),
            status => {
                info!("read access refused: {}", status.as_str());
                Err(MediaError::PermissionDenied)
            }
        }
    }

    fn begin_session(&self) -> MediaResult<SessionGuard> {
        self.session.try_begin().map_err(|e| {
            info!("rejected: another enumeration is in progress");
            e
        })
    }

    /// Collections for the requested mode, one per bucket in first-seen order.
    pub async fn collections(&self, opts: CollectionOptions) -> MediaResult<Vec<CollectionSummary>> {
        self.ensure_read_access().await?;
        let mode = CollectionMode::resolve(opts.collection_mode.as_deref())?;
        let guard = self.begin_session()?;
        debug!("collections mode={:?}", mode);
        session::collect_buckets(Arc::clone(&self.index), mode.bucket_filter(), guard).await
    }

    pub async fn photos(&self, collection_ids: Option<Vec<String>>, opts: ListOptions) -> MediaResult<MediaStream> {
        self.list(MediaType::Photo, collection_ids, opts).await
    }

    pub async fn videos(&self, collection_ids: Option<Vec<String>>, opts: ListOptions) -> MediaResult<MediaStream> {
        self.list(MediaType::Video, collection_ids, opts).await
    }

    async fn list(
        &self,
        media_type: MediaType,
        collection_ids: Option<Vec<String>>,
        opts: ListOptions,
    ) -> MediaResult<MediaStream> {
        self.ensure_read_access().await?;
        let guard = self.begin_session()?;
        let query = MediaQuery { media_type, bucket_ids: collection_ids.unwrap_or_default() };
        Ok(session::spawn_media_walk(Arc::clone(&self.index), query, WalkPlan::from(&opts), guard))
    }

    pub async fn thumbnail(&self, id: Option<&str>, opts: ThumbnailOptions) -> MediaResult<ImageOutput> {
        self.ensure_read_access().await?;
        let id = validate_id(id)?.to_string();
        self.render(id, RenderRequest::thumbnail(&opts)).await
    }

    pub async fn image(&self, id: Option<&str>, opts: ImageOptions) -> MediaResult<ImageOutput> {
        self.ensure_read_access().await?;
        let id = validate_id(id)?.to_string();
        self.render(id, RenderRequest::image(&opts)).await
    }

    async fn render(&self, id: String, req: RenderRequest) -> MediaResult<ImageOutput> {
        let index = Arc::clone(&self.index);
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || render(index.as_ref(), codec.as_ref(), &id, &req))
            .await
            .map_err(worker_failed)?
    }

    /// Copies a video somewhere readable and returns where it went.
    pub async fn video(&self, id: Option<&str>) -> MediaResult<VideoExport> {
        self.ensure_read_access().await?;
        let id = validate_id(id)?.to_string();
        let index = Arc::clone(&self.index);
        let exports = Arc::clone(&self.exports);
        tokio::task::spawn_blocking(move || {
            let location = index
                .locate(MediaType::Video, &id)
                .map_err(MediaError::source_query)?
                .ok_or_else(|| MediaError::NotFound(id.clone()))?;
            exports.export(&location.path).map(VideoExport::complete)
        })
        .await
        .map_err(|e| MediaError::ExportFailed(format!("worker task failed: {}", e)))?
    }

    /// Flags the running enumeration, if any. Always succeeds.
    pub fn cancel(&self) {
        if self.session.cancel() {
            info!("enumeration cancel requested");
        } else {
            debug!("cancel with no enumeration running");
        }
    }
}
