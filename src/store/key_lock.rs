//! Per-record locks serializing read-modify-write sequences.
//!
//! Each `(kind, key)` pair maps to its own `tokio::sync::Mutex`, so updates
//! to different records proceed in parallel and only updates to the same
//! record queue up. The lock `Arc` is cloned out of the `DashMap` before
//! awaiting so no shard lock is held across an await point.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::records::RecordKind;

type LockKey = (RecordKind, String);

#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

/// Exclusive access to one record. Dropping it unlocks and prunes the entry.
pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the record `key` of `kind`.
    ///
    /// The returned guard exists while waiting too, so a caller cancelled
    /// before acquiring still prunes the entry.
    pub(crate) async fn lock(&self, kind: RecordKind, key: &str) -> KeyGuard<'_> {
        let key = (kind, key.to_string());
        let lock = Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let mut held = KeyGuard {
            locks: self,
            key,
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of live lock entries.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_key_locks_drop_prunes_idle_entry() {
        let locks = KeyLocks::new();
        let guard = locks.lock(RecordKind::Url, "docs/a.txt").await;
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_key_locks_entry_kept_while_another_task_waits() {
        let locks = KeyLocks::new();
        let first = locks.lock(RecordKind::Url, "docs/a.txt").await;

        let mut waiter = Box::pin(locks.lock(RecordKind::Url, "docs/a.txt"));
        let pending = tokio::time::timeout(Duration::from_millis(20), &mut waiter).await;
        assert!(pending.is_err());

        drop(first);
        assert_eq!(locks.len(), 1, "waiter still holds the entry");

        let second = waiter.await;
        drop(second);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_key_locks_cancelled_waiter_prunes_entry() {
        let locks = KeyLocks::new();
        let first = locks.lock(RecordKind::Url, "docs/a.txt").await;

        let mut waiter = Box::pin(locks.lock(RecordKind::Url, "docs/a.txt"));
        let pending = tokio::time::timeout(Duration::from_millis(20), &mut waiter).await;
        assert!(pending.is_err());

        drop(first);
        assert_eq!(locks.len(), 1);
        drop(waiter);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_key_locks_cancelled_holder_prunes_entry() {
        let locks = KeyLocks::new();
        let cancelled = tokio::time::timeout(Duration::from_millis(20), async {
            let _guard = locks.lock(RecordKind::Url, "docs/a.txt").await;
            std::future::pending::<()>().await;
        })
        .await;

        assert!(cancelled.is_err());
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_key_locks_distinct_kinds_do_not_block() {
        let locks = KeyLocks::new();
        let _url = locks.lock(RecordKind::Url, "same").await;
        let file = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(RecordKind::File, "same"),
        )
        .await;
        assert!(file.is_ok());
    }

    #[tokio::test]
    async fn test_key_locks_same_key_waits_for_holder() {
        let locks = KeyLocks::new();
        let guard = locks.lock(RecordKind::Url, "docs/a.txt").await;

        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(RecordKind::Url, "docs/a.txt"),
        )
        .await;
        assert!(waiting.is_err(), "second locker should still be waiting");

        drop(guard);
        let acquired = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(RecordKind::Url, "docs/a.txt"),
        )
        .await;
        assert!(acquired.is_ok());
    }
}
