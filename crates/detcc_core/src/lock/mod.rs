//! Deterministic two-phase locking.
//!
//! Every key owns a FIFO queue of lock requests. The set of transactions
//! holding a key at any instant is the longest prefix of its queue whose
//! modes are mutually compatible under the manager's [`LockPolicy`]. Because
//! that set depends only on arrival order and modes, replaying the same
//! request sequence on another machine grants locks in the same order.
//!
//! A request that cannot be granted immediately increments its
//! transaction's wait count. When a release grants the last outstanding
//! request of a transaction, the transaction is handed to the execution
//! engine through the [`ReadyQueue`].

mod manager;
mod mode;
mod policy;
mod ready;

pub use manager::{ExclusiveLockManager, LockManager, SharedLockManager};
pub use mode::{LockMode, LockRequest};
pub use policy::{ExclusiveOnly, LockPolicy, SharedExclusive};
pub use ready::ReadyQueue;
