//! Record types for categories, files and access-controlled URLs.
//!
//! The three record kinds share two pieces:
//! - [`Stats`] - per-entity download counter
//! - a unique `name` that doubles as the store key
//!
//! A [`UrlRecord`] binds one category to one file and carries the
//! [`AccessConfig`] the policy evaluator inspects. It references its
//! category and file by name only; it does not own them.

mod config;
mod names;

use std::fmt;

pub use config::{AccessConfig, Quota};
pub use names::{NameError, validate_category_name, validate_filename};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Separator between category and filename in a URL key.
pub const URL_KEY_SEPARATOR: char = '/';

/// Builds the store key of the URL serving `filename` under `category`.
///
/// No escaping is applied; callers keep the separator out of category names.
#[must_use]
pub fn url_key(category: &str, filename: &str) -> String {
    format!("{category}{URL_KEY_SEPARATOR}{filename}")
}

/// Splits a URL key back into `(category, filename)`.
///
/// Splits on the first separator, so filenames may themselves contain `/`.
#[must_use]
pub fn split_url_key(key: &str) -> Option<(&str, &str)> {
    let (category, filename) = key.split_once(URL_KEY_SEPARATOR)?;
    if category.is_empty() || filename.is_empty() {
        return None;
    }
    Some((category, filename))
}

/// Download counter kept on every record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Confirmed successful downloads.
    pub num_downloads: u64,
}

impl Stats {
    /// Counts one download. Saturates instead of wrapping.
    pub fn record_download(&mut self) {
        self.num_downloads = self.num_downloads.saturating_add(1);
    }
}

/// The entity kinds held by a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Category,
    File,
    Url,
}

impl RecordKind {
    /// Returns the stable label used in logs and table names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::File => "file",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common surface of every stored record.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned {
    /// The kind of entity this record is.
    const KIND: RecordKind;

    /// The record's unique key.
    fn name(&self) -> &str;

    /// Mutable access to the record's download counter.
    fn stats_mut(&mut self) -> &mut Stats;
}

/// Administrative grouping of downloadable files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Whether the category appears in public listings.
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub stats: Stats,
}

impl CategoryRecord {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Record for CategoryRecord {
    const KIND: RecordKind = RecordKind::Category;

    fn name(&self) -> &str {
        &self.name
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }
}

/// Metadata for one file in the managed directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path within the managed directory.
    pub name: String,
    /// Length in bytes.
    #[serde(default)]
    pub size: u64,
    /// Hex-encoded MD5 of the contents.
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub stats: Stats,
}

impl FileRecord {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Record for FileRecord {
    const KIND: RecordKind = RecordKind::File;

    fn name(&self) -> &str {
        &self.name
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }
}

/// Access-controlled binding of a category to a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlRecord {
    /// `category/file`, see [`url_key`].
    pub name: String,
    /// Name of the owning [`CategoryRecord`].
    pub category: String,
    /// Name of the served [`FileRecord`].
    pub file: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: AccessConfig,
    #[serde(default)]
    pub stats: Stats,
}

impl UrlRecord {
    /// Creates a disabled URL for `file` under `category` with its key derived.
    #[must_use]
    pub fn new(category: impl Into<String>, file: impl Into<String>) -> Self {
        let category = category.into();
        let file = file.into();
        Self {
            name: url_key(&category, &file),
            category,
            file,
            ..Self::default()
        }
    }
}

impl Record for UrlRecord {
    const KIND: RecordKind = RecordKind::Url;

    fn name(&self) -> &str {
        &self.name
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }
}
