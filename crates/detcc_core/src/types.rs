//! Core type definitions.

use std::fmt;

/// Unique identifier for a transaction.
///
/// Transaction IDs are assigned by the sequencer, strictly increasing and
/// never reused. The same value doubles as the logical timestamp used for
/// multi-version ordering, so a larger ID always means "later".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Timestamp of the baseline versions written at initialization.
    pub const ZERO: Self = Self(0);

    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next transaction ID.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for TransactionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_ordering() {
        let t1 = TransactionId::new(1);
        let t2 = TransactionId::new(2);
        assert!(t1 < t2);
        assert!(TransactionId::ZERO < t1);
    }

    #[test]
    fn transaction_id_next() {
        let t = TransactionId::new(5);
        assert_eq!(t.next().as_u64(), 6);
    }

    #[test]
    fn transaction_id_display() {
        let t = TransactionId::from(42);
        assert_eq!(format!("{t}"), "txn:42");
    }
}
