//! Single-flight enumeration sessions.
//!
//! At most one list walk runs per [`SessionGate`]. A walk runs on a blocking
//! worker, streams [`MediaBatch`]es back over a channel and checks for
//! cancellation once per row.

use futures_util::Stream;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::db::{BucketFilter, MediaIndex, MediaQuery};
use crate::error::{MediaError, MediaResult};
use crate::models::{CollectionSummary, ListOptions, MediaBatch, MediaRecord};
use crate::pipeline::buckets::BucketAggregator;

const STREAM_CAPACITY: usize = 16;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle = 0,
    Running = 1,
    Cancelled = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SessionState::Running,
            2 => SessionState::Cancelled,
            _ => SessionState::Idle,
        }
    }
}

/// How a walk ended, for logging. Errors are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    LimitReached,
    Cancelled,
    /// The consumer dropped its stream.
    Abandoned,
}

#[derive(Debug, Default)]
pub struct SessionGate {
    state: AtomicU8,
}

impl SessionGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Claims the gate, or fails with `SessionBusy` while any session
    /// (running or cancelled but not yet wound down) holds it.
    pub fn try_begin(self: &Arc<Self>) -> MediaResult<SessionGuard> {
        self.state
            .compare_exchange(
                SessionState::Idle as u8,
                SessionState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| MediaError::SessionBusy)?;
        debug!("enumeration session started");
        Ok(SessionGuard { gate: Arc::clone(self) })
    }

    /// Flags the running session, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Running as u8,
                SessionState::Cancelled as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Ownership of the gate. Dropping it returns the gate to `Idle`.
#[derive(Debug)]
pub struct SessionGuard {
    gate: Arc<SessionGate>,
}

impl SessionGuard {
    pub fn is_cancelled(&self) -> bool {
        self.gate.state() == SessionState::Cancelled
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.gate.state.store(SessionState::Idle as u8, Ordering::SeqCst);
        debug!("enumeration session released");
    }
}

/// Pagination and pacing of one media walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkPlan {
    pub offset: usize,
    /// 0 means unlimited.
    pub limit: usize,
    pub batch_size: usize,
    pub interval: Duration,
}

impl From<&ListOptions> for WalkPlan {
    fn from(opts: &ListOptions) -> Self {
        Self {
            offset: opts.offset(),
            limit: opts.limit(),
            batch_size: opts.batch_size(),
            interval: Duration::from_millis(opts.interval_ms()),
        }
    }
}

/// Ordered batches of one walk. The last item is either the final batch or
/// an error; the stream ends after it.
pub struct MediaStream {
    rx: Receiver<MediaResult<MediaBatch>>,
}

impl MediaStream {
    pub async fn next_batch(&mut self) -> Option<MediaResult<MediaBatch>> {
        self.rx.recv().await
    }

    /// Drains the stream into one list of records.
    pub async fn collect_records(mut self) -> MediaResult<Vec<MediaRecord>> {
        let mut out = Vec::new();
        while let Some(batch) = self.rx.recv().await {
            out.extend(batch?.items);
        }
        Ok(out)
    }
}

impl Stream for MediaStream {
    type Item = MediaResult<MediaBatch>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Starts a media walk on the blocking pool and returns its stream.
pub fn spawn_media_walk(
    index: Arc<dyn MediaIndex>,
    query: MediaQuery,
    plan: WalkPlan,
    guard: SessionGuard,
) -> MediaStream {
    let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
    tokio::task::spawn_blocking(move || run_media_walk(index.as_ref(), &query, plan, guard, &tx));
    MediaStream { rx }
}

fn run_media_walk(
    index: &dyn MediaIndex,
    query: &MediaQuery,
    plan: WalkPlan,
    guard: SessionGuard,
    tx: &Sender<MediaResult<MediaBatch>>,
) {
    info!(
        "media walk: type={:?} buckets={} offset={} limit={} batch={}",
        query.media_type,
        query.bucket_ids.len(),
        plan.offset,
        plan.limit,
        plan.batch_size
    );
    let mut batch: Vec<MediaRecord> = Vec::new();
    let mut fetched = 0usize;
    let mut delivered = 0usize;
    let mut outcome = WalkOutcome::Completed;

    let walked = index.walk_media(query, &mut |row| {
        if guard.is_cancelled() {
            outcome = WalkOutcome::Cancelled;
            return ControlFlow::Break(());
        }
        fetched += 1;
        if fetched <= plan.offset {
            return ControlFlow::Continue(());
        }
        batch.push(MediaRecord::from_row(row));
        delivered += 1;

        let limit_hit = plan.limit > 0 && delivered >= plan.limit;
        if batch.len() >= plan.batch_size || limit_hit {
            let items = std::mem::take(&mut batch);
            if tx.blocking_send(Ok(MediaBatch { items, is_final: false })).is_err() {
                outcome = WalkOutcome::Abandoned;
                return ControlFlow::Break(());
            }
            if limit_hit {
                outcome = WalkOutcome::LimitReached;
                return ControlFlow::Break(());
            }
            std::thread::sleep(plan.interval);
        }
        ControlFlow::Continue(())
    });

    // The gate is free before the caller hears the walk is over.
    drop(guard);

    match walked {
        Ok(()) => {
            info!("media walk finished: {:?}, {} delivered", outcome, delivered);
            let _ = tx.blocking_send(Ok(MediaBatch { items: batch, is_final: true }));
        }
        Err(e) => {
            warn!("media walk failed after {} rows: {:#}", fetched, e);
            let _ = tx.blocking_send(Err(MediaError::source_query(e)));
        }
    }
}

/// Walks bucket rows on the blocking pool and aggregates them. A cancelled
/// walk returns what was aggregated so far.
pub async fn collect_buckets(
    index: Arc<dyn MediaIndex>,
    filter: BucketFilter,
    guard: SessionGuard,
) -> MediaResult<Vec<CollectionSummary>> {
    let task = tokio::task::spawn_blocking(move || {
        let mut agg = BucketAggregator::new();
        let mut outcome = WalkOutcome::Completed;
        let walked = index.walk_buckets(&filter, &mut |row| {
            if guard.is_cancelled() {
                outcome = WalkOutcome::Cancelled;
                return ControlFlow::Break(());
            }
            agg.push(row);
            ControlFlow::Continue(())
        });
        drop(guard);
        match walked {
            Ok(()) => {
                info!("bucket walk finished: {:?}, {} collections", outcome, agg.len());
                Ok(agg.finish())
            }
            Err(e) => {
                warn!("bucket walk failed: {:#}", e);
                Err(MediaError::source_query(e))
            }
        }
    });
    task.await
        .map_err(|e| MediaError::SourceQueryFailed(format!("worker task failed: {}", e)))?
}
