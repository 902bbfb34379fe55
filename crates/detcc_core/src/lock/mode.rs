//! Lock modes and queued requests.

use crate::types::TransactionId;
use std::fmt;

/// Mode in which a key is locked.
///
/// Modes are ordered by strength. The combined mode of a granted set is the
/// maximum of its members' modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    /// Nobody holds the key.
    #[default]
    Unlocked,
    /// Read lock; compatible with other shared locks.
    Shared,
    /// Write lock; compatible with nothing.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unlocked => "unlocked",
            Self::Shared => "shared",
            Self::Exclusive => "exclusive",
        };
        f.write_str(name)
    }
}

/// A transaction's request for a key, as stored in the key's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    /// Requested mode.
    pub mode: LockMode,
    /// Requesting transaction.
    pub txn: TransactionId,
}

impl LockRequest {
    /// Creates a new lock request.
    #[must_use]
    pub const fn new(mode: LockMode, txn: TransactionId) -> Self {
        Self { mode, txn }
    }
}
