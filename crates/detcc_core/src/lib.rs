//! # detcc Core
//!
//! Concurrency-control core for a deterministic transaction engine.
//!
//! This crate provides:
//! - A lock manager implementing deterministic two-phase locking with FIFO
//!   per-key queues, in an exclusive-only and a shared/exclusive policy
//! - A multi-version storage engine with timestamp-ordered read/write
//!   validation and explicit per-key locking
//!
//! The core is passive: it spawns nothing and schedules nothing. An external
//! execution engine requests locks, waits for transactions to show up in the
//! [`ReadyQueue`], drives storage calls under [`KeyGuard`]s and finally
//! releases every lock it took.
//!
//! ## Example
//!
//! ```rust
//! use detcc_core::{MvccStorage, ReadyQueue, SharedLockManager, TransactionId};
//!
//! let ready = ReadyQueue::new();
//! let mut locks = SharedLockManager::new(ready.clone());
//! let t1 = TransactionId::new(1);
//!
//! assert!(locks.write_lock(t1, 7u64).unwrap());
//!
//! let storage = MvccStorage::seeded(0u64..16, 0u64);
//! let mut guard = storage.lock(&7).unwrap();
//! assert_eq!(guard.read(t1), Some(0));
//! assert!(guard.check_write(t1));
//! guard.write(42, t1).unwrap();
//! drop(guard);
//!
//! locks.release(t1, &7).unwrap();
//! assert!(ready.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod lock;
pub mod mvcc;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use lock::{
    ExclusiveLockManager, ExclusiveOnly, LockManager, LockMode, LockPolicy, LockRequest,
    ReadyQueue, SharedExclusive, SharedLockManager,
};
pub use mvcc::{KeyGuard, MvccStorage, StorageStats, Version, VersionHistory};
pub use types::TransactionId;
