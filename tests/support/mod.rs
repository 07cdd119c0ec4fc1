//! Shared seeding helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use filegate_core::{
    AccessConfig, CategoryRecord, Database, DatabaseOptions, FileRecord, RecordStore, SqliteStore,
    UrlRecord,
};
use tempfile::TempDir;

pub const CATEGORY: &str = "docs";
pub const FILENAME: &str = "manual.pdf";
pub const URL_KEY: &str = "docs/manual.pdf";

/// Writes a URL with `config` plus its category and file records.
pub async fn seed_all<S: RecordStore + ?Sized>(store: &S, config: AccessConfig) {
    seed_url(store, config).await;
    store
        .set_category(CATEGORY, &CategoryRecord::new(CATEGORY))
        .await
        .expect("seed category");
    store
        .set_file(FILENAME, &FileRecord::new(FILENAME))
        .await
        .expect("seed file");
}

/// Writes only the URL record.
pub async fn seed_url<S: RecordStore + ?Sized>(store: &S, config: AccessConfig) {
    let mut url = UrlRecord::new(CATEGORY, FILENAME);
    url.config = config;
    store.set_url(URL_KEY, &url).await.expect("seed url");
}

/// Opens a file-backed SQLite store in a fresh temp directory.
///
/// The `TempDir` must outlive the store.
pub async fn sqlite_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("records.db");
    let db = Database::new(&db_path, DatabaseOptions::default())
        .await
        .expect("Failed to open database");
    (temp_dir, Arc::new(SqliteStore::new(db)))
}

pub async fn url<S: RecordStore + ?Sized>(store: &S) -> UrlRecord {
    store
        .get_url(URL_KEY)
        .await
        .expect("read url")
        .expect("url exists")
}

pub async fn category_downloads<S: RecordStore + ?Sized>(store: &S) -> u64 {
    store
        .get_category(CATEGORY)
        .await
        .expect("read category")
        .expect("category exists")
        .stats
        .num_downloads
}

pub async fn file_downloads<S: RecordStore + ?Sized>(store: &S) -> u64 {
    store
        .get_file(FILENAME)
        .await
        .expect("read file")
        .expect("file exists")
        .stats
        .num_downloads
}
