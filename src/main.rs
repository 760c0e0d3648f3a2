use std::io::Write;
use std::sync::Arc;

use nazr_media_bridge::db::{self, SqliteIndex};
use nazr_media_bridge::library::PhotoLibrary;
use nazr_media_bridge::models::{CollectionOptions, ListOptions, MediaBatch};
use nazr_media_bridge::permission::StaticPermissionGate;
use nazr_media_bridge::pipeline::codec::ImageCodec;
use nazr_media_bridge::pipeline::discover;
use nazr_media_bridge::pipeline::export::CacheDirExport;
use nazr_media_bridge::utils::config::Config;
use nazr_media_bridge::utils::logging;
use nazr_media_bridge::MediaStream;
use tracing::{info, warn};

async fn dump_stream(label: &str, mut stream: MediaStream, out: &mut impl Write) -> anyhow::Result<usize> {
    let mut total = 0;
    while let Some(batch) = stream.next_batch().await {
        let batch: MediaBatch = batch?;
        total += batch.items.len();
        writeln!(out, "{}", serde_json::json!({ "kind": label, "batch": batch }))?;
    }
    Ok(total)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cfg = Config::from_env();
    let db_path = cfg.db_path();
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::create_dir_all(cfg.exports_dir())?;
    std::fs::create_dir_all(cfg.derived_dir())?;

    let pool = db::create_pool(&db_path, cfg.pool_size)?;
    info!("index at {:?}", db_path);

    if cfg.scan_on_start {
        match discover::index_root(&cfg.root, &pool).await {
            Ok(summary) => info!("indexed {} files, pruned {}", summary.indexed, summary.pruned),
            Err(e) => warn!("scan of {:?} failed: {:#}", cfg.root, e),
        }
    }

    let library = PhotoLibrary::new(
        Arc::new(SqliteIndex::new(pool)),
        Arc::new(ImageCodec::with_cache(cfg.derived_dir())),
        Arc::new(StaticPermissionGate::new(cfg.access)),
        Arc::new(CacheDirExport::new(cfg.exports_dir())),
    );
    info!("authorization: {}", library.authorization_status().as_str());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let collections = library
        .collections(CollectionOptions { collection_mode: Some(cfg.collection_mode.clone()) })
        .await?;
    writeln!(out, "{}", serde_json::json!({ "kind": "collections", "items": collections }))?;

    let list_opts = ListOptions { batch_size: Some(cfg.page_size), interval: 0, ..Default::default() };
    let photos = dump_stream("photos", library.photos(None, list_opts.clone()).await?, &mut out).await?;
    let videos = dump_stream("videos", library.videos(None, list_opts).await?, &mut out).await?;
    out.flush()?;

    info!("dumped {} collections, {} photos, {} videos", collections.len(), photos, videos);
    Ok(())
}
