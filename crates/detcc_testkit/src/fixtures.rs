//! Test fixtures.
//!
//! Convenience constructors for the core components in the shapes tests
//! use most: `u64` keys, `u64` values and a fresh ready queue per manager.

use detcc_core::{
    Config, ExclusiveLockManager, LockManager, LockPolicy, MvccStorage, ReadyQueue,
    SharedLockManager, TransactionId,
};

/// Shorthand for `TransactionId::new`.
#[must_use]
pub fn txn(id: u64) -> TransactionId {
    TransactionId::new(id)
}

/// Creates a lock manager of any policy together with its ready queue.
#[must_use]
pub fn lock_manager<P: LockPolicy>() -> (LockManager<u64, P>, ReadyQueue) {
    let ready = ReadyQueue::new();
    (LockManager::new(ready.clone()), ready)
}

/// Creates an exclusive-only lock manager and its ready queue.
#[must_use]
pub fn exclusive_manager() -> (ExclusiveLockManager<u64>, ReadyQueue) {
    lock_manager()
}

/// Creates a shared/exclusive lock manager and its ready queue.
#[must_use]
pub fn shared_manager() -> (SharedLockManager<u64>, ReadyQueue) {
    lock_manager()
}

/// Creates storage for keys `0..key_count`, each seeded with `0`.
#[must_use]
pub fn seeded_storage(key_count: u64) -> MvccStorage<u64, u64> {
    MvccStorage::seeded(0..key_count, 0)
}

/// Creates storage for keys `0..key_count` without baseline versions.
#[must_use]
pub fn empty_storage(key_count: u64) -> MvccStorage<u64, u64> {
    MvccStorage::with_keys(0..key_count)
}

/// Creates storage from a configuration.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn configured_storage(config: &Config) -> MvccStorage<u64, u64> {
    MvccStorage::with_config(config).expect("invalid storage configuration")
}
