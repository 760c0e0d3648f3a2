use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::db::{create_pool, BucketFilter, BucketRow, DbPool, MediaIndex, MediaLocation, MediaQuery};
use crate::models::{MediaType, RawMediaRow};

const MEDIA_COLUMNS: &str = "id, media_type, title, date_taken, latitude, longitude, width, height, orientation, duration, bucket_id, bucket_display_name, mime";

/// Media index backed by the SQLite `media` table.
#[derive(Clone)]
pub struct SqliteIndex {
    pool: DbPool,
}

impl SqliteIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn open<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        Ok(Self::new(create_pool(db_path, pool_size)?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn count(&self, media_type: MediaType) -> Result<i64> {
        let conn = self.pool.get()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM media WHERE media_type = ?1",
            params![media_type.code()],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}

// Orientation is read the way a cursor getString would: integers stringify.
fn text_or_number(row: &Row<'_>, col: &str) -> rusqlite::Result<Option<String>> {
    Ok(match row.get::<_, Value>(col)? {
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some((f as i64).to_string()),
        Value::Null | Value::Blob(_) => None,
    })
}

fn row_to_media(row: &Row<'_>) -> rusqlite::Result<RawMediaRow> {
    let code: i64 = row.get("media_type")?;
    Ok(RawMediaRow {
        id: row.get("id")?,
        media_type: MediaType::from_code(code).unwrap_or_default(),
        title: row.get("title")?,
        date_taken: row.get("date_taken")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        width: row.get("width")?,
        height: row.get("height")?,
        orientation: text_or_number(row, "orientation")?,
        duration_ms: row.get("duration")?,
        bucket_id: row.get("bucket_id")?,
        bucket_display_name: row.get("bucket_display_name")?,
        mime: row.get("mime")?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn media_sql(query: &MediaQuery) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {} FROM media WHERE media_type = ?", MEDIA_COLUMNS);
    let mut args = vec![Value::from(query.media_type.code())];
    if !query.bucket_ids.is_empty() {
        sql.push_str(&format!(" AND bucket_id IN ({})", placeholders(query.bucket_ids.len())));
        args.extend(query.bucket_ids.iter().cloned().map(Value::from));
    }
    // NULL capture times sort last under DESC.
    sql.push_str(" ORDER BY date_taken DESC, id DESC");
    (sql, args)
}

impl MediaIndex for SqliteIndex {
    fn walk_media(
        &self,
        query: &MediaQuery,
        visit: &mut dyn FnMut(RawMediaRow) -> ControlFlow<()>,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        let (sql, args) = media_sql(query);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        while let Some(row) = rows.next()? {
            if visit(row_to_media(row)?).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn walk_buckets(
        &self,
        filter: &BucketFilter,
        visit: &mut dyn FnMut(BucketRow) -> ControlFlow<()>,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        let mut args = vec![Value::from(MediaType::Photo.code())];
        let mut sql = String::from("SELECT bucket_id, bucket_display_name FROM media WHERE media_type = ?");
        if let BucketFilter::DisplayName(name) = filter {
            sql.push_str(" AND bucket_display_name = ?");
            args.push(Value::from(name.clone()));
        }
        sql.push_str(" ORDER BY bucket_display_name");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        while let Some(row) = rows.next()? {
            let item = BucketRow { bucket_id: row.get(0)?, bucket_name: row.get(1)? };
            if visit(item).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn locate(&self, media_type: MediaType, id: &str) -> Result<Option<MediaLocation>> {
        let Ok(id) = id.trim().parse::<i64>() else {
            return Ok(None);
        };
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                "SELECT id, data, orientation, mime FROM media WHERE id = ?1 AND media_type = ?2",
                params![id, media_type.code()],
                |row| {
                    Ok(MediaLocation {
                        id: row.get("id")?,
                        path: PathBuf::from(row.get::<_, String>("data")?),
                        orientation: text_or_number(row, "orientation")?,
                        mime: row.get("mime")?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }
}
