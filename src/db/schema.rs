use anyhow::Result;
use rusqlite::Connection;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

/// Per-connection settings for pooled connections.
pub fn connection_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS media (
  id INTEGER PRIMARY KEY,
  data TEXT NOT NULL UNIQUE,
  media_type INTEGER NOT NULL,
  title TEXT,
  date_taken INTEGER,
  latitude REAL,
  longitude REAL,
  width INTEGER,
  height INTEGER,
  orientation TEXT,
  duration INTEGER,
  bucket_id TEXT NOT NULL,
  bucket_display_name TEXT
);

CREATE INDEX IF NOT EXISTS idx_media_type_taken ON media(media_type, date_taken);
CREATE INDEX IF NOT EXISTS idx_media_bucket ON media(bucket_id);
CREATE INDEX IF NOT EXISTS idx_media_bucket_name ON media(bucket_display_name);
    "#,
    )?;

    // Indexes created before MIME tracking lack the column.
    let mut has_mime = false;
    {
        let mut stmt = conn.prepare("PRAGMA table_info(media)")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in rows {
            if name.unwrap_or_default() == "mime" {
                has_mime = true;
                break;
            }
        }
    }
    if !has_mime {
        conn.execute("ALTER TABLE media ADD COLUMN mime TEXT", [])?;
    }

    Ok(())
}
