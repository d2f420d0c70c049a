// libs/appointment-cell/src/services/locking.rs
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::BucketKey;

/// Single-writer lock per (doctor, date) bucket.
///
/// Holding a bucket's guard across "search conflicts, then write" makes the
/// pair atomic with respect to every other writer in this process.
#[derive(Default)]
pub struct BucketLocks {
    locks: Mutex<HashMap<BucketKey, Arc<AsyncMutex<()>>>>,
}

/// Releases every held bucket when dropped.
pub struct BucketGuard {
    keys: Vec<BucketKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl BucketGuard {
    pub fn keys(&self) -> &[BucketKey] {
        &self.keys
    }

    pub fn covers(&self, key: &BucketKey) -> bool {
        self.keys.contains(key)
    }
}

impl BucketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires all `keys`. Keys are deduplicated and taken in sorted order
    /// so two writers spanning the same buckets cannot deadlock.
    pub async fn acquire<I>(&self, keys: I) -> BucketGuard
    where
        I: IntoIterator<Item = BucketKey>,
    {
        let keys: Vec<BucketKey> = keys.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map are idle.
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);

            keys.iter()
                .map(|key| Arc::clone(locks.entry(key.clone()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        for key in &keys {
            debug!("Holding scheduling lock for {}", key);
        }
        BucketGuard { keys, _guards: guards }
    }

    /// Number of buckets currently tracked, idle ones included.
    pub fn tracked_buckets(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
