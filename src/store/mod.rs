//! Record store seam for category, file and URL persistence.
//!
//! The access controller depends only on [`RecordStore`]; two
//! implementations ship with the crate:
//! - [`SqliteStore`] - `SQLite`-backed, one table per record kind
//! - [`MemoryStore`] - in-process store with fault injection for tests
//!
//! Every write is an upsert keyed by the record's `name`. Passing a key that
//! differs from the record's own name is refused with
//! [`StoreError::KeyMismatch`].
//!
//! The `update_*` methods are the atomic read-modify-write path: the store
//! guarantees that no other update of the same record interleaves with the
//! read and the write, whichever controller or process issued it.

mod error;
mod key_lock;
mod memory;
mod sqlite;

pub use error::{StoreDbErrorKind, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::records::{CategoryRecord, FileRecord, Record, UrlRecord};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// In-place change applied by an `update_*` call. Returns a flag passed
/// back to the caller.
pub type Mutation<R> = dyn Fn(&mut R) -> bool + Send + Sync;

/// Data-access contract for category, file and URL records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches a category by name.
    async fn get_category(&self, name: &str) -> Result<Option<CategoryRecord>>;

    /// Creates or replaces a category.
    async fn set_category(&self, name: &str, category: &CategoryRecord) -> Result<()>;

    /// Deletes a category. Returns whether a record was removed.
    async fn delete_category(&self, name: &str) -> Result<bool>;

    /// Lists all categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>>;

    /// Lists categories flagged public, ordered by name.
    async fn list_public_categories(&self) -> Result<Vec<CategoryRecord>>;

    /// Atomically applies `apply` to a category.
    ///
    /// Returns `None` when the category does not exist, else the flag
    /// `apply` returned.
    async fn update_category(
        &self,
        name: &str,
        apply: &Mutation<CategoryRecord>,
    ) -> Result<Option<bool>>;

    /// Fetches a file record by name.
    async fn get_file(&self, name: &str) -> Result<Option<FileRecord>>;

    /// Creates or replaces a file record.
    async fn set_file(&self, name: &str, file: &FileRecord) -> Result<()>;

    /// Deletes a file record. Returns whether a record was removed.
    async fn delete_file(&self, name: &str) -> Result<bool>;

    /// Lists all file records ordered by name.
    async fn list_files(&self) -> Result<Vec<FileRecord>>;

    /// Atomically applies `apply` to a file record.
    async fn update_file(&self, name: &str, apply: &Mutation<FileRecord>) -> Result<Option<bool>>;

    /// Fetches a URL record by key.
    async fn get_url(&self, key: &str) -> Result<Option<UrlRecord>>;

    /// Creates or replaces a URL record.
    async fn set_url(&self, key: &str, url: &UrlRecord) -> Result<()>;

    /// Deletes a URL record. Returns whether a record was removed.
    async fn delete_url(&self, key: &str) -> Result<bool>;

    /// Lists all URL records ordered by key.
    async fn list_urls(&self) -> Result<Vec<UrlRecord>>;

    /// Atomically applies `apply` to a URL record.
    async fn update_url(&self, key: &str, apply: &Mutation<UrlRecord>) -> Result<Option<bool>>;
}

/// Refuses writes whose key differs from the record's name.
fn check_key<R: Record>(key: &str, record: &R) -> Result<()> {
    if key == record.name() {
        Ok(())
    } else {
        Err(StoreError::KeyMismatch {
            key: key.to_string(),
            name: record.name().to_string(),
        })
    }
}
