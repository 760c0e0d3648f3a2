pub mod schema;
pub mod writer;
pub mod query;

use anyhow::Result;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::models::{MediaType, RawMediaRow};

pub use query::SqliteIndex;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// A media walk holds one connection for its whole run, so the pool always
/// keeps a second one for lookups made while it is paced.
pub const MIN_POOL_SIZE: u32 = 2;

pub fn open_or_create<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    schema::apply_pragmas(&conn)?;
    schema::apply_schema(&conn)?;
    Ok(conn)
}

/// Pool over `db_path` with at least [`MIN_POOL_SIZE`] connections.
pub fn create_pool<P: AsRef<Path>>(db_path: P, size: u32) -> Result<DbPool> {
    // Schema goes in once; pooled connections only get per-connection pragmas.
    open_or_create(db_path.as_ref())?;
    let manager = SqliteConnectionManager::file(db_path.as_ref())
        .with_init(|conn| schema::connection_pragmas(conn));
    let pool = r2d2::Pool::builder().max_size(size.max(MIN_POOL_SIZE)).build(manager)?;
    Ok(pool)
}

/// Which rows a media walk covers. An empty `bucket_ids` means every bucket.
#[derive(Debug, Clone, Default)]
pub struct MediaQuery {
    pub media_type: MediaType,
    pub bucket_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketFilter {
    All,
    DisplayName(String),
}

/// One bucket row per indexed item; the index does not deduplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRow {
    pub bucket_id: String,
    pub bucket_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MediaLocation {
    pub id: i64,
    pub path: PathBuf,
    pub orientation: Option<String>,
    pub mime: Option<String>,
}

/// The queryable media index the library enumerates.
///
/// Walks are synchronous and hand rows to `visit` one at a time in index
/// order; returning `ControlFlow::Break` stops the walk early without error.
pub trait MediaIndex: Send + Sync {
    /// Rows of one media type, most recent capture first.
    fn walk_media(
        &self,
        query: &MediaQuery,
        visit: &mut dyn FnMut(RawMediaRow) -> ControlFlow<()>,
    ) -> Result<()>;

    /// Bucket id/name of every photo matching `filter`, ordered by bucket name.
    fn walk_buckets(
        &self,
        filter: &BucketFilter,
        visit: &mut dyn FnMut(BucketRow) -> ControlFlow<()>,
    ) -> Result<()>;

    fn locate(&self, media_type: MediaType, id: &str) -> Result<Option<MediaLocation>>;
}
