use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::parse_datetime, models::BlockRecord};
use crate::enforcement::store::{not_blocked, DeadlineStore};

const BLOCK_UNTIL_KEY: &str = "block_until";

impl Database {
    /// Persisted block deadline, the Unix epoch when unset.
    pub async fn get_blocked_until(&self) -> Result<DateTime<Utc>> {
        self.execute(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    params![BLOCK_UNTIL_KEY],
                    |row| row.get(0),
                )
                .optional()
                .context("failed to read block deadline")?;

            match raw {
                Some(value) => parse_datetime(&value, BLOCK_UNTIL_KEY),
                None => Ok(not_blocked()),
            }
        })
        .await
    }

    /// Moves the deadline forward to `until`; an earlier value is ignored.
    /// Returns the deadline in effect afterwards.
    pub async fn advance_blocked_until(&self, until: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open deadline transaction")?;

            let current = tx
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    params![BLOCK_UNTIL_KEY],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .map(|value| parse_datetime(&value, BLOCK_UNTIL_KEY))
                .transpose()?
                .unwrap_or_else(not_blocked);

            let effective = current.max(until);
            if effective > current {
                tx.execute(
                    "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![
                        BLOCK_UNTIL_KEY,
                        effective.to_rfc3339(),
                        Utc::now().to_rfc3339(),
                    ],
                )
                .context("failed to write block deadline")?;
            }

            tx.commit().context("failed to commit block deadline")?;
            Ok(effective)
        })
        .await
    }
}

impl DeadlineStore for Database {
    async fn blocked_until(&self) -> Result<DateTime<Utc>> {
        self.get_blocked_until().await
    }

    async fn set_blocked_until(&self, until: DateTime<Utc>) -> Result<()> {
        self.advance_blocked_until(until).await.map(|_| ())
    }

    async fn record_block(&self, record: BlockRecord) -> Result<()> {
        self.insert_block(&record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("shortsguard.sqlite3")).unwrap();
        (dir, db)
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(minute)
    }

    #[tokio::test]
    async fn unset_deadline_reads_as_epoch() {
        let (_dir, db) = open();
        assert_eq!(db.get_blocked_until().await.unwrap(), not_blocked());
    }

    #[tokio::test]
    async fn deadline_only_moves_forward() {
        let (_dir, db) = open();

        assert_eq!(db.advance_blocked_until(at(20)).await.unwrap(), at(20));
        assert_eq!(db.advance_blocked_until(at(5)).await.unwrap(), at(20));
        assert_eq!(db.get_blocked_until().await.unwrap(), at(20));

        db.set_blocked_until(at(40)).await.unwrap();
        assert_eq!(db.blocked_until().await.unwrap(), at(40));
    }

    #[tokio::test]
    async fn deadline_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortsguard.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            db.set_blocked_until(at(20)).await.unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(reopened.blocked_until().await.unwrap(), at(20));
    }
}
