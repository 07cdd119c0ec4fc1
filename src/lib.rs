//! Filegate Core Library
//!
//! Conditional access for statically served files. Each downloadable file
//! is reachable only through a named URL record (`category/filename`)
//! carrying an access policy; successful downloads are accounted on the
//! URL, its category and the file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`records`] - Category, file and URL record types
//! - [`access`] - Policy evaluation, allow checks and download accounting
//! - [`store`] - Record store contract with `SQLite` and in-memory backends
//! - [`db`] - Database connection and schema management
//! - [`clock`] - Time source for policy evaluation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod access;
pub mod clock;
pub mod db;
pub mod records;
pub mod store;

// Re-export commonly used types
pub use access::{
    AccessController, AccessOptions, AccountingReport, Decision, DenyReason, EntityOutcome,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{Database, DatabaseOptions, DbError};
pub use records::{
    AccessConfig, CategoryRecord, FileRecord, Quota, RecordKind, Stats, UrlRecord, url_key,
};
pub use store::{MemoryStore, RecordStore, SqliteStore, StoreError};
