//! In-process record store.
//!
//! Records are held as JSON values so reads hand out independent copies,
//! the same way a database round-trip would. Reads and writes can be made
//! to fail per record kind, and reads can be slowed down to widen race
//! windows in concurrency tests. `update_*` calls hold a per-record lock
//! for the whole read-modify-write.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::instrument;

use super::key_lock::KeyLocks;
use super::{Mutation, RecordStore, Result, StoreError, check_key};
use crate::records::{CategoryRecord, FileRecord, Record, RecordKind, UrlRecord};

/// `DashMap`-backed [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<(RecordKind, String), serde_json::Value>,
    failing_reads: DashSet<RecordKind>,
    failing_writes: DashSet<RecordKind>,
    writes: DashMap<RecordKind, u64>,
    read_delay: Option<Duration>,
    locks: KeyLocks,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` after every single-record read.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Makes reads of `kind` fail with [`StoreError::Unavailable`] while `failing` is set.
    pub fn set_read_failure(&self, kind: RecordKind, failing: bool) {
        if failing {
            self.failing_reads.insert(kind);
        } else {
            self.failing_reads.remove(&kind);
        }
    }

    /// Makes writes of `kind` fail with [`StoreError::Unavailable`] while `failing` is set.
    pub fn set_write_failure(&self, kind: RecordKind, failing: bool) {
        if failing {
            self.failing_writes.insert(kind);
        } else {
            self.failing_writes.remove(&kind);
        }
    }

    /// Number of successful writes (upserts and deletes) of `kind`.
    #[must_use]
    pub fn write_count(&self, kind: RecordKind) -> u64 {
        self.writes.get(&kind).map_or(0, |count| *count)
    }

    fn check_read(&self, kind: RecordKind) -> Result<()> {
        if self.failing_reads.contains(&kind) {
            return Err(StoreError::Unavailable(format!("{kind} reads disabled")));
        }
        Ok(())
    }

    fn check_write(&self, kind: RecordKind) -> Result<()> {
        if self.failing_writes.contains(&kind) {
            return Err(StoreError::Unavailable(format!("{kind} writes disabled")));
        }
        Ok(())
    }

    fn count_write(&self, kind: RecordKind) {
        *self.writes.entry(kind).or_insert(0) += 1;
    }

    async fn get<R: Record>(&self, name: &str) -> Result<Option<R>> {
        self.check_read(R::KIND)?;
        let value = self
            .records
            .get(&(R::KIND, name.to_string()))
            .map(|entry| entry.value().clone());

        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(value.map(serde_json::from_value::<R>).transpose()?)
    }

    async fn update<R: Record>(&self, name: &str, apply: &Mutation<R>) -> Result<Option<bool>> {
        let _guard = self.locks.lock(R::KIND, name).await;
        let Some(mut record) = self.get::<R>(name).await? else {
            return Ok(None);
        };
        let flagged = apply(&mut record);
        self.set(name, &record)?;
        Ok(Some(flagged))
    }

    #[cfg(test)]
    fn live_locks(&self) -> usize {
        self.locks.len()
    }

    fn set<R: Record>(&self, key: &str, record: &R) -> Result<()> {
        self.check_write(R::KIND)?;
        check_key(key, record)?;
        let value = serde_json::to_value(record)?;
        self.records.insert((R::KIND, key.to_string()), value);
        self.count_write(R::KIND);
        Ok(())
    }

    fn delete(&self, kind: RecordKind, name: &str) -> Result<bool> {
        self.check_write(kind)?;
        let removed = self.records.remove(&(kind, name.to_string())).is_some();
        if removed {
            self.count_write(kind);
        }
        Ok(removed)
    }

    fn list<R: Record>(&self) -> Result<Vec<R>> {
        self.check_read(R::KIND)?;
        let mut values: Vec<(String, serde_json::Value)> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == R::KIND)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));

        values
            .into_iter()
            .map(|(_, value)| serde_json::from_value::<R>(value).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get_category(&self, name: &str) -> Result<Option<CategoryRecord>> {
        self.get(name).await
    }

    #[instrument(skip(self, category))]
    async fn set_category(&self, name: &str, category: &CategoryRecord) -> Result<()> {
        self.set(name, category)
    }

    async fn delete_category(&self, name: &str) -> Result<bool> {
        self.delete(RecordKind::Category, name)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>> {
        self.list()
    }

    async fn list_public_categories(&self) -> Result<Vec<CategoryRecord>> {
        let categories: Vec<CategoryRecord> = self.list()?;
        Ok(categories.into_iter().filter(|c| c.public).collect())
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
        self.set(name, file)
    }

    async fn delete_file(&self, name: &str) -> Result<bool> {
        self.delete(RecordKind::File, name)
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.list()
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
        self.set(key, url)
    }

    async fn delete_url(&self, key: &str) -> Result<bool> {
        self.delete(RecordKind::Url, key)
    }

    async fn list_urls(&self) -> Result<Vec<UrlRecord>> {
        self.list()
    }

    #[instrument(skip(self, apply))]
    async fn update_url(&self, key: &str, apply: &Mutation<UrlRecord>) -> Result<Option<bool>> {
        self.update(key, apply).await
    }
}
