//! Access control and download accounting.
//!
//! [`AccessController`] answers two questions for the serving layer:
//! - before sending bytes: may `category/filename` be downloaded?
//! - after a confirmed transfer: record the download
//!
//! The allow check fails closed. A missing URL, a store error and a
//! refusing policy all produce the same `false`, so callers cannot tell
//! "does not exist" from "exists but denied".
//!
//! Accounting touches three records independently: the URL (quota and
//! counter), its category (counter) and the file (counter). Each is a
//! read-modify-write against the store; a failure in one never blocks or
//! rolls back the others. Nothing is returned as an error: anomalies are
//! logged and summarized in an [`AccountingReport`].
//!
//! By default each read-modify-write goes through the store's atomic
//! `update_*` methods, so concurrent accountings of the same record never
//! lose an update, even from separate controllers or processes sharing a
//! database.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use filegate_core::{AccessController, MemoryStore, RecordStore, UrlRecord, AccessConfig, Quota};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let mut url = UrlRecord::new("docs", "manual.pdf");
//! url.config = AccessConfig::enabled_with(Quota::Remaining(1));
//! store.set_url(&url.name, &url).await?;
//!
//! let access = AccessController::new(store);
//! assert!(access.is_allowed("docs", "manual.pdf").await);
//! access.downloaded("docs", "manual.pdf").await;
//! assert!(!access.is_allowed("docs", "manual.pdf").await);
//! # Ok(())
//! # }
//! ```

mod accounting;
pub mod policy;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub use policy::{Decision, DenyReason};

use crate::clock::{Clock, SystemClock};
use crate::records::{CategoryRecord, FileRecord, RecordKind, UrlRecord, url_key};
use crate::store::{self, Mutation, RecordStore};

/// Tuning for [`AccessController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessOptions {
    /// Account through the store's atomic `update_*` methods.
    ///
    /// When off, accounting is a plain get followed by a set, and two
    /// concurrent accountings of the same record can both read the old
    /// value so that one update is lost.
    pub serialize_updates: bool,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            serialize_updates: true,
        }
    }
}

/// What happened to one record during accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    /// The record was read, changed and written back.
    Updated,
    /// No record exists under the key.
    Missing,
    /// The store failed on read or write.
    Failed,
}

impl EntityOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Missing => "missing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EntityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-record summary of one [`AccessController::downloaded`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountingReport {
    pub url: EntityOutcome,
    pub category: EntityOutcome,
    pub file: EntityOutcome,
    /// This download used up the URL's quota and disabled it.
    pub url_disabled: bool,
}

impl AccountingReport {
    /// True when all three records were updated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [self.url, self.category, self.file]
            .iter()
            .all(|outcome| *outcome == EntityOutcome::Updated)
    }
}

/// Decides downloads and accounts for completed ones.
///
/// Holds no record state between calls: every operation re-reads the store.
/// Cloning is cheap.
pub struct AccessController<S: RecordStore + ?Sized, C: Clock = SystemClock> {
    store: Arc<S>,
    clock: Arc<C>,
    options: AccessOptions,
}

impl<S: RecordStore + ?Sized, C: Clock> Clone for AccessController<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            options: self.options,
        }
    }
}

impl<S: RecordStore + ?Sized> AccessController<S, SystemClock> {
    /// Creates a controller using wall-clock time and default options.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, SystemClock, AccessOptions::default())
    }
}

impl<S: RecordStore + ?Sized, C: Clock> AccessController<S, C> {
    /// Creates a controller with an explicit clock and options.
    pub fn with_clock(store: Arc<S>, clock: C, options: AccessOptions) -> Self {
        Self {
            store,
            clock: Arc::new(clock),
            options,
        }
    }

    /// The options this controller was built with.
    #[must_use]
    pub fn options(&self) -> AccessOptions {
        self.options
    }

    /// Decides whether `filename` may be served under `category`, with the reason.
    ///
    /// Read-only. Store failures and missing records deny.
    #[instrument(skip(self))]
    pub async fn decide(&self, category: &str, filename: &str) -> Decision {
        let key = url_key(category, filename);
        match self.store.get_url(&key).await {
            Ok(Some(url)) => policy::evaluate(&url.config, self.clock.now()),
            Ok(None) => Decision::Deny(DenyReason::NotFound),
            Err(e) => {
                warn!(url_key = %key, error = %e, "URL lookup failed, denying download");
                Decision::Deny(DenyReason::StoreError)
            }
        }
    }

    /// Returns true when `filename` may be served under `category`.
    ///
    /// Never fails: anything other than an allowing policy is `false`.
    pub async fn is_allowed(&self, category: &str, filename: &str) -> bool {
        let decision = self.decide(category, filename).await;
        if let Decision::Deny(reason) = decision {
            debug!(category, filename, %reason, "download denied");
        }
        decision.is_allow()
    }

    /// Accounts for a download the caller has confirmed was delivered.
    ///
    /// Updates the URL, category and file records concurrently. Missing
    /// records and store failures are logged and reported, never raised.
    #[instrument(skip(self))]
    pub async fn downloaded(&self, category: &str, filename: &str) -> AccountingReport {
        let key = url_key(category, filename);
        let key = key.as_str();
        let store = self.store.as_ref();
        let on_url: &Mutation<UrlRecord> = &accounting::record_url_download;
        let on_category: &Mutation<CategoryRecord> = &accounting::record_download::<CategoryRecord>;
        let on_file: &Mutation<FileRecord> = &accounting::record_download::<FileRecord>;

        let ((url, url_disabled), (category_outcome, _), (file, _)) =
            if self.options.serialize_updates {
                tokio::join!(
                    settle(RecordKind::Url, key, store.update_url(key, on_url)),
                    settle(
                        RecordKind::Category,
                        category,
                        store.update_category(category, on_category),
                    ),
                    settle(
                        RecordKind::File,
                        filename,
                        store.update_file(filename, on_file),
                    ),
                )
            } else {
                tokio::join!(
                    settle(
                        RecordKind::Url,
                        key,
                        get_then_set(store.get_url(key), on_url, |url| async move {
                            store.set_url(key, &url).await
                        }),
                    ),
                    settle(
                        RecordKind::Category,
                        category,
                        get_then_set(store.get_category(category), on_category, |record| {
                            async move { store.set_category(category, &record).await }
                        }),
                    ),
                    settle(
                        RecordKind::File,
                        filename,
                        get_then_set(store.get_file(filename), on_file, |record| async move {
                            store.set_file(filename, &record).await
                        }),
                    ),
                )
            };

        if url_disabled {
            info!(url_key = %key, "download quota used up, URL disabled");
        }

        let report = AccountingReport {
            url,
            category: category_outcome,
            file,
            url_disabled,
        };
        debug!(?report, "download accounted");
        report
    }
}

/// Unsynchronized read-modify-write: read, apply, write back.
async fn get_then_set<R, G, W, WF>(
    get: G,
    apply: &Mutation<R>,
    write: W,
) -> store::Result<Option<bool>>
where
    G: Future<Output = store::Result<Option<R>>>,
    W: FnOnce(R) -> WF,
    WF: Future<Output = store::Result<()>>,
{
    let Some(mut record) = get.await? else {
        return Ok(None);
    };
    let flagged = apply(&mut record);
    write(record).await?;
    Ok(Some(flagged))
}

/// Turns one record's update result into an outcome, logging anomalies.
async fn settle<F>(kind: RecordKind, key: &str, update: F) -> (EntityOutcome, bool)
where
    F: Future<Output = store::Result<Option<bool>>>,
{
    match update.await {
        Ok(Some(flagged)) => (EntityOutcome::Updated, flagged),
        Ok(None) => {
            warn!(%kind, key, "record downloaded but does not exist");
            (EntityOutcome::Missing, false)
        }
        Err(e) => {
            error!(%kind, key, error = %e, "failed to update record after download");
            (EntityOutcome::Failed, false)
        }
    }
}

impl<S, C> AccessController<S, C>
where
    S: RecordStore + ?Sized + 'static,
    C: Clock + 'static,
{
    /// Spawns [`AccessController::downloaded`] on the runtime and returns immediately.
    pub fn spawn_downloaded(
        &self,
        category: impl Into<String>,
        filename: impl Into<String>,
    ) -> JoinHandle<AccountingReport> {
        let controller = self.clone();
        let category = category.into();
        let filename = filename.into();
        tokio::spawn(async move { controller.downloaded(&category, &filename).await })
    }
}
