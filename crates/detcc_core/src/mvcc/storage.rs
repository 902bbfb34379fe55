//! Multi-version storage engine with explicit per-key locks.

use super::version::{Version, VersionHistory};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use tracing::{debug, trace};

/// Counts reported by [`MvccStorage::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of registered keys.
    pub keys: usize,
    /// Number of versions across all keys.
    pub versions: usize,
}

/// Multi-version key/value storage validated by timestamp ordering.
///
/// The key table is fixed once the storage is shared: keys are registered
/// while the caller still has `&mut self`, each with its own mutex and
/// version history. Afterwards every access goes through [`KeyGuard`]s
/// obtained from [`lock`](Self::lock), so unrelated keys can be used from
/// different threads at the same time.
///
/// # Deadlock avoidance
///
/// A thread that needs several keys at once must lock them in ascending key
/// order. [`lock_many`](Self::lock_many) does this for you.
pub struct MvccStorage<K, V> {
    keys: HashMap<K, Mutex<VersionHistory<V>>>,
}

impl<K, V> Default for MvccStorage<K, V> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }
}

impl<K, V> MvccStorage<K, V>
where
    K: Eq + Hash + Ord + fmt::Debug,
{
    /// Creates storage with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage holding `keys`, none of which has a version yet.
    #[must_use]
    pub fn with_keys(keys: impl IntoIterator<Item = K>) -> Self {
        let mut storage = Self::new();
        for key in keys {
            storage.insert_key(key);
        }
        storage
    }

    /// Creates storage holding `keys`, each seeded with `value` at
    /// timestamp zero so that every transaction finds a baseline version.
    #[must_use]
    pub fn seeded(keys: impl IntoIterator<Item = K>, value: V) -> Self
    where
        V: Clone,
    {
        let keys = keys
            .into_iter()
            .map(|key| {
                let mut history = VersionHistory::new();
                history.push(Version::new(TransactionId::ZERO, value.clone()));
                (key, Mutex::new(history))
            })
            .collect();
        Self { keys }
    }

    /// Registers `key` with an empty history.
    ///
    /// Returns `false` if the key was already registered; its history is
    /// left unchanged.
    pub fn insert_key(&mut self, key: K) -> bool {
        if self.keys.contains_key(&key) {
            return false;
        }
        self.keys.insert(key, Mutex::new(VersionHistory::new()));
        true
    }

    /// Checks if `key` is registered.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }

    /// Returns the number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Checks if no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Acquires the lock of `key`, waiting for any other holder.
    ///
    /// The lock is released when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `key` is not registered.
    pub fn lock(&self, key: &K) -> CoreResult<KeyGuard<'_, K, V>> {
        let (key, history) = self.keys.get_key_value(key).ok_or_else(|| {
            CoreError::precondition(format!("lock of unregistered key {key:?}"))
        })?;

        Ok(KeyGuard {
            key,
            history: history.lock(),
            validated: None,
        })
    }

    /// Locks every key in `keys` in ascending order, skipping duplicates.
    ///
    /// Guards are returned in ascending key order. If a key is not
    /// registered, the locks taken so far are released before returning.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if any key is not registered.
    pub fn lock_many<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k K>,
    ) -> CoreResult<Vec<KeyGuard<'_, K, V>>>
    where
        K: 'k,
    {
        let ordered: BTreeSet<&K> = keys.into_iter().collect();
        ordered.into_iter().map(|key| self.lock(key)).collect()
    }

    /// Returns key and version counts.
    ///
    /// Takes `&mut self`, so no guard can be outstanding and no mutex is
    /// touched.
    pub fn stats(&mut self) -> StorageStats {
        StorageStats {
            keys: self.keys.len(),
            versions: self
                .keys
                .values_mut()
                .map(|history| history.get_mut().len())
                .sum(),
        }
    }
}

impl<V: Clone + Default> MvccStorage<u64, V> {
    /// Creates storage for the keyspace `0..config.keyspace_size`.
    ///
    /// When `config.seed_initial_versions` is set, each key gets
    /// `V::default()` written at timestamp zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: &Config) -> CoreResult<Self> {
        config.validate()?;

        let keyspace = 0..config.keyspace_size;
        let storage = if config.seed_initial_versions {
            Self::seeded(keyspace, V::default())
        } else {
            Self::with_keys(keyspace)
        };

        debug!(
            keys = config.keyspace_size,
            seeded = config.seed_initial_versions,
            "storage initialized"
        );
        Ok(storage)
    }
}

impl<K, V> fmt::Debug for MvccStorage<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MvccStorage")
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to one key's version history.
///
/// All reads, validations and writes of a key happen through its guard. A
/// successful [`check_write`](Self::check_write) stays valid for as long as
/// the guard is held, which is what makes the following
/// [`write`](Self::write) safe.
pub struct KeyGuard<'a, K, V> {
    key: &'a K,
    history: MutexGuard<'a, VersionHistory<V>>,
    /// Transaction whose write passed validation under this guard.
    validated: Option<TransactionId>,
}

impl<K: fmt::Debug, V> KeyGuard<'_, K, V> {
    /// Returns the locked key.
    #[must_use]
    pub fn key(&self) -> &K {
        self.key
    }

    /// Reads the value visible to `txn`.
    ///
    /// On a hit, `txn` is recorded as a reader of the returned version, and a
    /// pending validation for an earlier transaction is dropped.
    /// `None` means nothing was written at or before `txn`.
    pub fn read(&mut self, txn: TransactionId) -> Option<V>
    where
        V: Clone,
    {
        let value = self.history.read(txn).cloned();
        if value.is_some() && self.validated.is_some_and(|validated| validated < txn) {
            debug!(key = ?self.key, %txn, "write validation invalidated by later read");
            self.validated = None;
        }
        trace!(key = ?self.key, %txn, found = value.is_some(), "mvcc read");
        value
    }

    /// Checks whether `txn` may write this key.
    ///
    /// Returns `false` if a later transaction has already written the key or
    /// read a version that this write would come before.
    pub fn check_write(&mut self, txn: TransactionId) -> bool {
        let accepted = self.history.accepts_write(txn);
        if accepted {
            self.validated = Some(txn);
        } else {
            self.validated = None;
            debug!(key = ?self.key, %txn, "write rejected by timestamp order");
        }
        accepted
    }

    /// Writes `value` as a new version at `txn`.
    ///
    /// The write is not validated again.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation unless [`check_write`](Self::check_write)
    /// last returned `true` for `txn` under this guard and no later
    /// transaction has read the key since.
    pub fn write(&mut self, value: V, txn: TransactionId) -> CoreResult<()> {
        if self.validated != Some(txn) {
            return Err(CoreError::precondition(format!(
                "{txn} wrote {:?} without a passing write check",
                self.key
            )));
        }

        self.history.push(Version::new(txn, value));
        trace!(key = ?self.key, %txn, "mvcc write");
        Ok(())
    }

    /// Returns the locked key's version history.
    #[must_use]
    pub fn history(&self) -> &VersionHistory<V> {
        &self.history
    }

    /// Returns the number of versions of the locked key.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.history.len()
    }

    /// Releases the lock. Equivalent to dropping the guard.
    pub fn unlock(self) {}
}

impl<K: fmt::Debug, V> fmt::Debug for KeyGuard<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", self.key)
            .field("versions", &self.history.len())
            .field("validated", &self.validated)
            .finish()
    }
}
