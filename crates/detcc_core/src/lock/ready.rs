//! Hand-off queue of fully granted transactions.

use crate::types::TransactionId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Transactions whose whole lock set has been granted.
///
/// The queue belongs to the execution engine. Lock managers hold a clone of
/// the handle and only ever append to it; every clone observes the same
/// underlying queue.
#[derive(Debug, Clone, Default)]
pub struct ReadyQueue {
    inner: Arc<Mutex<VecDeque<TransactionId>>>,
}

impl ReadyQueue {
    /// Creates a new empty ready queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, txn: TransactionId) {
        self.inner.lock().push_back(txn);
    }

    /// Removes and returns the oldest ready transaction.
    pub fn pop(&self) -> Option<TransactionId> {
        self.inner.lock().pop_front()
    }

    /// Removes and returns every ready transaction in hand-off order.
    pub fn drain(&self) -> Vec<TransactionId> {
        self.inner.lock().drain(..).collect()
    }

    /// Returns the queued transactions without removing them.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TransactionId> {
        self.inner.lock().iter().copied().collect()
    }

    /// Returns the number of ready transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Checks if no transaction is ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
