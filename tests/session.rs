mod common;

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use futures_util::StreamExt;
use nazr_media_bridge::db::{BucketFilter, BucketRow, MediaIndex, MediaLocation, MediaQuery};
use nazr_media_bridge::models::{CollectionOptions, ListOptions, MediaBatch, MediaType, RawMediaRow};
use nazr_media_bridge::permission::{AuthorizationStatus, StaticPermissionGate};
use nazr_media_bridge::pipeline::codec::ImageCodec;
use nazr_media_bridge::pipeline::export::CacheDirExport;
use nazr_media_bridge::pipeline::session::SessionState;
use nazr_media_bridge::{MediaError, MediaStream, PhotoLibrary};

fn opts(offset: i64, limit: i64, batch_size: Option<i64>, interval: i64) -> ListOptions {
    ListOptions { offset, limit, interval, batch_size }
}

async fn drain(mut stream: MediaStream) -> Vec<MediaBatch> {
    let mut out = Vec::new();
    while let Some(batch) = stream.next_batch().await {
        out.push(batch.unwrap());
    }
    out
}

#[tokio::test]
async fn test_unlimited_walk_is_one_final_batch() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 5);
    let lib = test_library(pool, tmp.path());

    let batches = drain(lib.photos(None, ListOptions::default()).await.unwrap()).await;
    assert_eq!(batches.len(), 1);
    assert!(batches[0].is_final);
    let names: Vec<&str> = batches[0].items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["img004", "img003", "img002", "img001", "img000"]);
}

#[tokio::test]
async fn test_limit_flushes_then_final() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 25);
    let lib = test_library(pool, tmp.path());

    let batches = drain(lib.photos(None, opts(0, 10, None, 0)).await.unwrap()).await;
    assert_eq!(batches.len(), 2);
    assert!(!batches[0].is_final);
    assert_eq!(batches[0].items.len(), 10);
    assert!(batches[1].is_final);
    assert!(batches[1].items.is_empty());
}

#[tokio::test]
async fn test_batch_size_splits_limit() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 25);
    let lib = test_library(pool, tmp.path());

    let batches = drain(lib.photos(None, opts(0, 10, Some(4), 0)).await.unwrap()).await;
    let sizes: Vec<usize> = batches.iter().map(|b| b.items.len()).collect();
    assert_eq!(sizes, vec![4, 4, 2, 0]);
    assert_eq!(batches.iter().filter(|b| b.is_final).count(), 1);
    assert!(batches.last().unwrap().is_final);
}

#[tokio::test]
async fn test_batch_size_without_limit() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 7);
    let lib = test_library(pool, tmp.path());

    let batches = drain(lib.photos(None, opts(0, 0, Some(3), 0)).await.unwrap()).await;
    let sizes: Vec<usize> = batches.iter().map(|b| b.items.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[tokio::test]
async fn test_offset_skips_rows() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 10);
    let lib = test_library(pool, tmp.path());

    let all = lib.photos(None, ListOptions::default()).await.unwrap().collect_records().await.unwrap();
    let page = lib.photos(None, opts(3, 4, None, 0)).await.unwrap().collect_records().await.unwrap();
    assert_eq!(page, all[3..7].to_vec());

    let past_end = lib.photos(None, opts(50, 0, None, 0)).await.unwrap().collect_records().await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_walk_filters_by_bucket_and_type() {
    let (tmp, _, pool) = setup_test_db();
    seed(
        &pool,
        &[
            photo("/p/Camera/a.jpg", "1", "Camera", 3),
            photo("/p/Trip/b.jpg", "2", "Trip", 2),
            photo("/p/Trip/c.jpg", "2", "Trip", 1),
            video("/p/Trip/d.mp4", "2", "Trip", 4),
        ],
    );
    let lib = test_library(pool, tmp.path());

    let trip = lib
        .photos(Some(vec!["2".to_string()]), ListOptions::default())
        .await
        .unwrap()
        .collect_records()
        .await
        .unwrap();
    let names: Vec<&str> = trip.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);

    let videos = lib.videos(None, ListOptions::default()).await.unwrap().collect_records().await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].media_type, MediaType::Video);
    assert_eq!(videos[0].duration_ms, Some(4_000));
    assert!(videos[0].orientation.is_none());
}

#[tokio::test]
async fn test_second_walk_is_rejected_while_running() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 5);
    let lib = test_library(pool, tmp.path());

    let first = lib.photos(None, opts(0, 0, Some(1), 200)).await.unwrap();
    assert!(matches!(lib.photos(None, ListOptions::default()).await, Err(MediaError::SessionBusy)));
    assert!(matches!(lib.videos(None, ListOptions::default()).await, Err(MediaError::SessionBusy)));
    assert!(matches!(
        lib.collections(CollectionOptions::default()).await,
        Err(MediaError::SessionBusy)
    ));

    // the rejected calls leave the running walk alone
    assert_eq!(first.collect_records().await.unwrap().len(), 5);
    assert!(lib.photos(None, ListOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_cancel_stops_walk_with_final_batch() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 10);
    let lib = test_library(pool, tmp.path());

    let mut stream = lib.photos(None, opts(0, 0, Some(2), 500)).await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(!first.is_final);

    lib.cancel();
    let rest = drain(stream).await;
    assert_eq!(rest.len(), 1);
    assert!(rest[0].is_final);
    assert!(rest[0].items.is_empty());

    assert_eq!(lib.session_state(), SessionState::Idle);
    let again = lib.photos(None, ListOptions::default()).await.unwrap();
    assert_eq!(again.collect_records().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_cancel_when_idle_is_harmless() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 3);
    let lib = test_library(pool, tmp.path());

    lib.cancel();
    lib.cancel();
    let records = lib.photos(None, ListOptions::default()).await.unwrap().collect_records().await.unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_gate_free_once_final_batch_arrives() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 4);
    let lib = test_library(pool, tmp.path());

    let mut stream = lib.photos(None, opts(0, 0, Some(2), 0)).await.unwrap();
    loop {
        let batch = stream.next_batch().await.unwrap().unwrap();
        if batch.is_final {
            break;
        }
    }
    assert_eq!(lib.session_state(), SessionState::Idle);
}

#[tokio::test]
async fn test_dropped_stream_releases_gate() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 40);
    let lib = test_library(pool, tmp.path());

    let stream = lib.photos(None, opts(0, 0, Some(1), 20)).await.unwrap();
    drop(stream);

    let deadline = Instant::now() + Duration::from_secs(5);
    while lib.session_state() != SessionState::Idle {
        assert!(Instant::now() < deadline, "walk never noticed the dropped stream");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(lib.photos(None, ListOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_permission_checked_before_walk() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 2);
    let lib = library_with(pool, tmp.path(), Arc::new(ImageCodec::new()), AuthorizationStatus::Denied);

    assert!(matches!(lib.photos(None, ListOptions::default()).await, Err(MediaError::PermissionDenied)));
    assert_eq!(lib.session_state(), SessionState::Idle);
}

#[tokio::test]
async fn test_prompt_grants_access() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 2);
    let lib = library_with(pool, tmp.path(), Arc::new(ImageCodec::new()), AuthorizationStatus::NotDetermined);

    assert_eq!(lib.authorization_status(), AuthorizationStatus::NotDetermined);
    let records = lib.photos(None, ListOptions::default()).await.unwrap().collect_records().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(lib.authorization_status(), AuthorizationStatus::Granted);
}

/// Index that yields one row per walk, then fails while `failing` is set.
/// Bucket walks pause `bucket_delay` before each of their `buckets` rows.
struct ScriptedIndex {
    failing: AtomicBool,
    buckets: usize,
    bucket_delay: Duration,
}

impl ScriptedIndex {
    fn failing() -> Self {
        Self { failing: AtomicBool::new(true), buckets: 1, bucket_delay: Duration::ZERO }
    }

    fn slow_buckets(buckets: usize, delay: Duration) -> Self {
        Self { failing: AtomicBool::new(false), buckets, bucket_delay: delay }
    }
}

impl MediaIndex for ScriptedIndex {
    fn walk_media(
        &self,
        query: &MediaQuery,
        visit: &mut dyn FnMut(RawMediaRow) -> ControlFlow<()>,
    ) -> anyhow::Result<()> {
        let row = RawMediaRow {
            id: 1,
            media_type: query.media_type,
            title: Some("only".into()),
            bucket_id: "1".into(),
            ..Default::default()
        };
        if visit(row).is_break() {
            return Ok(());
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("disk gone");
        }
        Ok(())
    }

    fn walk_buckets(
        &self,
        _filter: &BucketFilter,
        visit: &mut dyn FnMut(BucketRow) -> ControlFlow<()>,
    ) -> anyhow::Result<()> {
        for i in 0..self.buckets {
            std::thread::sleep(self.bucket_delay);
            let row = BucketRow { bucket_id: i.to_string(), bucket_name: Some(format!("b{}", i)) };
            if visit(row).is_break() {
                return Ok(());
            }
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("disk gone");
            }
        }
        Ok(())
    }

    fn locate(&self, _media_type: MediaType, _id: &str) -> anyhow::Result<Option<MediaLocation>> {
        Ok(None)
    }
}

fn scripted_library(index: Arc<ScriptedIndex>, data: &std::path::Path) -> PhotoLibrary {
    PhotoLibrary::new(
        index,
        Arc::new(ImageCodec::new()),
        Arc::new(StaticPermissionGate::granted()),
        Arc::new(CacheDirExport::new(data.join("exports"))),
    )
}

#[tokio::test]
async fn test_failed_walk_releases_session_before_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    let index = Arc::new(ScriptedIndex::failing());
    let lib = scripted_library(index.clone(), tmp.path());

    let mut stream = lib.photos(None, ListOptions::default()).await.unwrap();
    let only = stream.next_batch().await.unwrap();
    match only {
        Err(MediaError::SourceQueryFailed(msg)) => assert!(msg.contains("disk gone"), "{}", msg),
        other => panic!("expected source failure, got {:?}", other),
    }
    assert_eq!(lib.session_state(), SessionState::Idle);
    assert!(stream.next_batch().await.is_none());

    index.failing.store(false, Ordering::SeqCst);
    let records = lib.photos(None, ListOptions::default()).await.unwrap().collect_records().await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_failed_collections_walk_releases_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    let index = Arc::new(ScriptedIndex::failing());
    let lib = scripted_library(index.clone(), tmp.path());

    let err = lib.collections(CollectionOptions::default()).await.unwrap_err();
    assert!(matches!(err, MediaError::SourceQueryFailed(_)));
    assert_eq!(lib.session_state(), SessionState::Idle);

    index.failing.store(false, Ordering::SeqCst);
    assert_eq!(lib.collections(CollectionOptions::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_stops_collections_walk() {
    let tmp = tempfile::TempDir::new().unwrap();
    let index = Arc::new(ScriptedIndex::slow_buckets(20, Duration::from_millis(100)));
    let lib = scripted_library(index, tmp.path());

    let running = {
        let lib = lib.clone();
        tokio::spawn(async move { lib.collections(CollectionOptions::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(lib.session_state(), SessionState::Running);
    lib.cancel();

    let partial = running.await.unwrap().unwrap();
    assert!(!partial.is_empty());
    assert!(partial.len() < 20, "walk ran to completion: {}", partial.len());
    assert_eq!(lib.session_state(), SessionState::Idle);
}

#[tokio::test]
async fn test_walk_pauses_between_deliveries() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 6);
    let lib = test_library(pool, tmp.path());

    let started = Instant::now();
    let batches = drain(lib.photos(None, opts(0, 0, Some(2), 100)).await.unwrap()).await;
    let elapsed = started.elapsed();
    let sizes: Vec<usize> = batches.iter().map(|b| b.items.len()).collect();
    assert_eq!(sizes, vec![2, 2, 2, 0]);
    assert!(elapsed >= Duration::from_millis(300), "paced walk took {:?}", elapsed);
}

#[tokio::test]
async fn test_negative_interval_paces_at_default() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 6);
    let lib = test_library(pool, tmp.path());

    let started = Instant::now();
    let records = lib.photos(None, opts(0, 0, Some(2), -1)).await.unwrap().collect_records().await.unwrap();
    let elapsed = started.elapsed();
    assert_eq!(records.len(), 6);
    // three deliveries at 30 ms each
    assert!(elapsed >= Duration::from_millis(90), "walk took {:?}", elapsed);
}

#[tokio::test]
async fn test_zero_interval_does_not_pause() {
    let (tmp, _, pool) = setup_test_db();
    seed_photos(&pool, 20);
    let lib = test_library(pool, tmp.path());

    let started = Instant::now();
    let records = lib.photos(None, opts(0, 0, Some(1), 0)).await.unwrap().collect_records().await.unwrap();
    let elapsed = started.elapsed();
    assert_eq!(records.len(), 20);
    // twenty deliveries at the 30 ms default would take 600 ms
    assert!(elapsed < Duration::from_millis(500), "unpaced walk took {:?}", elapsed);
}
