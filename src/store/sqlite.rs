//! `SQLite`-backed record store.
//!
//! `update_*` runs inside a `BEGIN IMMEDIATE` transaction, which takes the
//! database write lock before the read, so read-modify-write sequences on
//! the same file are serialized across pools and processes. Writes that
//! still fail with busy/locked (busy timeout exceeded) are retried a
//! bounded number of times.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use tracing::{instrument, warn};

use super::{Mutation, RecordStore, Result, check_key};
use crate::db::Database;
use crate::records::{CategoryRecord, FileRecord, Record, RecordKind, UrlRecord};

fn table(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Category => "categories",
        RecordKind::File => "files",
        RecordKind::Url => "urls",
    }
}

/// Total attempts for a write that keeps failing busy/locked.
const MAX_BUSY_ATTEMPTS: u32 = 3;

/// Delay before the second attempt; grows linearly per attempt.
const BUSY_BACKOFF: Duration = Duration::from_millis(50);

/// Runs `op` again while it fails busy/locked, up to [`MAX_BUSY_ATTEMPTS`].
async fn retry_busy<T, F, Fut>(kind: RecordKind, key: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_busy_or_locked() && attempt < MAX_BUSY_ATTEMPTS => {
                warn!(%kind, key, attempt, error = %e, "record store busy, retrying write");
                tokio::time::sleep(BUSY_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// [`RecordStore`] persisting each record kind in its own table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Creates a store on an opened (migrated) database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn get<R: Record>(&self, name: &str) -> Result<Option<R>> {
        let row = sqlx::query(&format!(
            "SELECT body FROM {} WHERE name = ?",
            table(R::KIND)
        ))
        .bind(name)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = row.try_get("body")?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn set<R: Record>(&self, key: &str, record: &R) -> Result<()> {
        check_key(key, record)?;
        let encoded = serde_json::to_string(record)?;
        let body = encoded.as_str();
        retry_busy(R::KIND, key, move || self.upsert::<R>(key, body)).await
    }

    async fn upsert<R: Record>(&self, key: &str, body: &str) -> Result<()> {
        sqlx::query(&format!(
            r"INSERT INTO {} (name, body, updated_at)
              VALUES (?, ?, datetime('now'))
              ON CONFLICT(name) DO UPDATE
              SET body = excluded.body, updated_at = excluded.updated_at",
            table(R::KIND)
        ))
        .bind(key)
        .bind(body)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    async fn update<R: Record>(&self, key: &str, apply: &Mutation<R>) -> Result<Option<bool>> {
        retry_busy(R::KIND, key, move || self.update_once(key, apply)).await
    }

    async fn update_once<R: Record>(&self, key: &str, apply: &Mutation<R>) -> Result<Option<bool>> {
        let table = table(R::KIND);
        let mut tx = self.db.pool().begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("SELECT body FROM {table} WHERE name = ?"))
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let body: String = row.try_get("body")?;
        let mut record: R = serde_json::from_str(&body)?;
        let flagged = apply(&mut record);
        check_key(key, &record)?;

        sqlx::query(&format!(
            "UPDATE {table} SET body = ?, updated_at = datetime('now') WHERE name = ?"
        ))
        .bind(serde_json::to_string(&record)?)
        .bind(key)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(flagged))
    }

    async fn delete(&self, kind: RecordKind, name: &str) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE name = ?", table(kind)))
            .bind(name)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_where<R: Record>(&self, filter: &str) -> Result<Vec<R>> {
        let rows = sqlx::query(&format!(
            "SELECT body FROM {} {filter} ORDER BY name ASC",
            table(R::KIND)
        ))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<R> {
                let body: String = row.try_get("body")?;
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get_category(&self, name: &str) -> Result<Option<CategoryRecord>> {
        self.get(name).await
    }

    #[instrument(skip(self, category))]
    async fn set_category(&self, name: &str, category: &CategoryRecord) -> Result<()> {
        self.set(name, category).await
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, name: &str) -> Result<bool> {
        self.delete(RecordKind::Category, name).await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>> {
        self.list_where("").await
    }

    async fn list_public_categories(&self) -> Result<Vec<CategoryRecord>> {
        self.list_where("WHERE json_extract(body, '$.public') = 1")
            .await
    }

    #[instrument(skip(self, apply))]
    async fn update_category(
        &self,
        name: &str,
        apply: &Mutation<CategoryRecord>,
    ) -> Result<Option<bool>> {
        self.update(name, apply).await
    }

    #[instrument(skip(self))]
    async fn get_file(&self, name: &str) -> Result<Option<FileRecord>> {
        self.get(name).await
    }

    #[instrument(skip(self, file))]
    async fn set_file(&self, name: &str, file: &FileRecord) -> Result<()> {
        self.set(name, file).await
    }

    #[instrument(skip(self))]
    async fn delete_file(&self, name: &str) -> Result<bool> {
        self.delete(RecordKind::File, name).await
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.list_where("").await
    }

    #[instrument(skip(self, apply))]
    async fn update_file(&self, name: &str, apply: &Mutation<FileRecord>) -> Result<Option<bool>> {
        self.update(name, apply).await
    }

    #[instrument(skip(self))]
    async fn get_url(&self, key: &str) -> Result<Option<UrlRecord>> {
        self.get(key).await
    }

    #[instrument(skip(self, url))]
    async fn set_url(&self, key: &str, url: &UrlRecord) -> Result<()> {
        self.set(key, url).await
    }

    #[instrument(skip(self))]
    async fn delete_url(&self, key: &str) -> Result<bool> {
        self.delete(RecordKind::Url, key).await
    }

    async fn list_urls(&self) -> Result<Vec<UrlRecord>> {
        self.list_where("").await
    }

    #[instrument(skip(self, apply))]
    async fn update_url(&self, key: &str, apply: &Mutation<UrlRecord>) -> Result<Option<bool>> {
        self.update(key, apply).await
    }
}
