/*!
 * SQLite-backed translation cache store.
 */

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::debug;
use rusqlite::{params, OptionalExtension, Row};

use super::connection::DatabaseConnection;
use crate::errors::CacheError;
use crate::translation::cache::{CacheEntry, CacheStore, StoreStats};

/// Persistent cache store over a [`DatabaseConnection`]
#[derive(Clone, Debug)]
pub struct CacheRepository {
    /// Database connection
    db: DatabaseConnection,
}

impl CacheRepository {
    /// Create a repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
        Ok(CacheEntry {
            key: row.get(0)?,
            source_language: row.get(1)?,
            target_language: row.get(2)?,
            original_text: row.get(3)?,
            draft_text: row.get(4)?,
            final_text: row.get(5)?,
            model: row.get(6)?,
            created_at: parse_timestamp(&row.get::<_, String>(7)?),
            last_used: parse_timestamp(&row.get::<_, String>(8)?),
        })
    }
}

/// Fixed-width UTC timestamp; lexicographic order matches time order
fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl CacheStore for CacheRepository {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let key = key.to_string();

        let entry = self
            .db
            .execute_async(move |conn| {
                let entry = conn
                    .query_row(
                        r#"
                        SELECT hash_key, source_lang, target_lang, original_text, draft_text,
                               final_text, model, created_at, last_used
                        FROM translation_cache WHERE hash_key = ?1
                        "#,
                        [&key],
                        Self::entry_from_row,
                    )
                    .optional()?;

                match entry {
                    Some(mut entry) => {
                        let now = Utc::now();
                        conn.execute(
                            "UPDATE translation_cache SET last_used = ?1 WHERE hash_key = ?2",
                            params![format_timestamp(now), key],
                        )?;
                        entry.last_used = now;
                        Ok(Some(entry))
                    }
                    None => Ok(None),
                }
            })
            .await?;

        Ok(entry)
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT OR REPLACE INTO translation_cache (
                        hash_key, source_lang, target_lang, original_text, draft_text,
                        final_text, model, created_at, last_used
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        entry.key,
                        entry.source_language,
                        entry.target_language,
                        entry.original_text,
                        entry.draft_text,
                        entry.final_text,
                        entry.model,
                        format_timestamp(entry.created_at),
                        format_timestamp(entry.last_used),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn cleanup(&self, max_age_days: u32) -> Result<usize, CacheError> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(i64::from(max_age_days)));

        let removed = self
            .db
            .execute_async(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM translation_cache WHERE last_used < ?1",
                    [cutoff],
                )?)
            })
            .await?;

        debug!("Removed {} stale cache rows", removed);
        Ok(removed)
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let removed = self
            .db
            .execute_async(|conn| Ok(conn.execute("DELETE FROM translation_cache", [])?))
            .await?;
        Ok(removed)
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        let cutoff = format_timestamp(Utc::now() - Duration::hours(24));

        let (total, recent) = self
            .db
            .execute_async(move |conn| {
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM translation_cache", [], |row| row.get(0))?;
                let recent: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM translation_cache WHERE last_used >= ?1",
                    [cutoff],
                    |row| row.get(0),
                )?;
                Ok((total, recent))
            })
            .await?;

        Ok(StoreStats {
            total_entries: usize::try_from(total).unwrap_or(0),
            entries_last_24h: usize::try_from(recent).unwrap_or(0),
        })
    }
}
