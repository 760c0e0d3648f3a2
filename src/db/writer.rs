use anyhow::Result;
use rusqlite::{params, Connection, Transaction};
use tracing::debug;

use crate::models::MediaType;

/// A file to be upserted into the media index, keyed by its path.
#[derive(Clone, Debug, Default)]
pub struct IndexEntry {
    pub path: String,
    pub media_type: MediaType,
    pub title: Option<String>,
    pub mime: Option<String>,
    pub date_taken: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub orientation: Option<String>,
    pub duration_ms: Option<i64>,
    pub bucket_id: String,
    pub bucket_display_name: Option<String>,
}

fn upsert_entry(tx: &Transaction<'_>, it: &IndexEntry) -> Result<i64> {
    let id = tx.query_row(
        "INSERT INTO media (data, media_type, title, mime, date_taken, latitude, longitude, width, height, orientation, duration, bucket_id, bucket_display_name)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
         ON CONFLICT(data) DO UPDATE SET media_type=excluded.media_type, title=excluded.title, mime=excluded.mime, date_taken=excluded.date_taken, latitude=excluded.latitude, longitude=excluded.longitude, width=excluded.width, height=excluded.height, orientation=excluded.orientation, duration=excluded.duration, bucket_id=excluded.bucket_id, bucket_display_name=excluded.bucket_display_name
         RETURNING id",
        params![
            it.path,
            it.media_type.code(),
            it.title,
            it.mime,
            it.date_taken,
            it.latitude,
            it.longitude,
            it.width,
            it.height,
            it.orientation,
            it.duration_ms,
            it.bucket_id,
            it.bucket_display_name,
        ],
        |r| r.get::<_, i64>(0),
    )?;
    Ok(id)
}

/// Upserts all entries in one transaction and returns their row ids in order.
pub fn write_entries(conn: &mut Connection, entries: &[IndexEntry]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        ids.push(upsert_entry(&tx, entry)?);
    }
    tx.commit()?;
    debug!("indexed {} entries", ids.len());
    Ok(ids)
}

/// Drops rows whose files are gone. Returns how many were removed.
pub fn prune_missing(conn: &mut Connection) -> Result<usize> {
    let paths: Vec<(i64, String)> = {
        let mut stmt = conn.prepare("SELECT id, data FROM media")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    let tx = conn.transaction()?;
    let mut removed = 0;
    for (id, path) in paths {
        if !std::path::Path::new(&path).exists() {
            removed += tx.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        }
    }
    tx.commit()?;
    Ok(removed)
}
