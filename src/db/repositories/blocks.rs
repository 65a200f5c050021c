use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
    models::BlockRecord,
};

fn row_to_block(row: &Row) -> Result<BlockRecord> {
    let started_at: String = row.get("started_at")?;
    let blocked_until: String = row.get("blocked_until")?;

    Ok(BlockRecord {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        blocked_until: parse_datetime(&blocked_until, "blocked_until")?,
        watched_ms: to_u64(row.get("watched_ms")?, "watched_ms")?,
    })
}

impl Database {
    pub async fn insert_block(&self, block: &BlockRecord) -> Result<()> {
        let record = block.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO blocks (id, started_at, blocked_until, watched_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.blocked_until.to_rfc3339(),
                    to_i64(record.watched_ms)?,
                ],
            )
            .context("failed to insert block record")?;
            Ok(())
        })
        .await
    }

    /// Newest first.
    pub async fn recent_blocks(&self, limit: u32) -> Result<Vec<BlockRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, blocked_until, watched_ms
                 FROM blocks
                 ORDER BY started_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut blocks = Vec::new();
            while let Some(row) = rows.next()? {
                blocks.push(row_to_block(row)?);
            }

            Ok(blocks)
        })
        .await
    }
}
