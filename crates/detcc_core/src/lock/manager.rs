//! Lock manager.

use super::mode::{LockMode, LockRequest};
use super::policy::{ExclusiveOnly, LockPolicy, SharedExclusive};
use super::ready::ReadyQueue;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Pending and granted requests for one key, in arrival order.
type LockQueue = VecDeque<LockRequest>;

/// Lock manager where every lock is exclusive.
pub type ExclusiveLockManager<K> = LockManager<K, ExclusiveOnly>;

/// Lock manager with shared read locks and exclusive write locks.
pub type SharedLockManager<K> = LockManager<K, SharedExclusive>;

/// Deterministic FIFO lock manager.
///
/// The manager is a passive table: mutating calls take `&mut self`, so the
/// execution engine serializes access with a single coarse lock (or a single
/// dispatch thread). `write_lock` and `read_lock` never block; they report
/// whether the request was granted and otherwise count it against the
/// transaction's wait count.
///
/// ## Invariants
///
/// - The granted requests of a key are always a prefix of its queue
/// - A transaction's wait count equals its requests not yet granted
/// - A transaction enters the ready queue exactly when its wait count drops
///   from one to zero because of a grant, and its count entry is removed
pub struct LockManager<K, P = SharedExclusive> {
    /// Key -> request queue. Empty queues are removed.
    lock_table: HashMap<K, LockQueue>,
    /// Transaction -> number of requests still waiting.
    wait_counts: HashMap<TransactionId, usize>,
    /// Hand-off to the execution engine.
    ready: ReadyQueue,
    _policy: PhantomData<P>,
}

impl<K, P> LockManager<K, P>
where
    K: Eq + Hash + Clone + fmt::Debug,
    P: LockPolicy,
{
    /// Creates a lock manager appending woken transactions to `ready`.
    #[must_use]
    pub fn new(ready: ReadyQueue) -> Self {
        Self::with_capacity(ready, 0)
    }

    /// Creates a lock manager sized from `config`.
    #[must_use]
    pub fn with_config(ready: ReadyQueue, config: &Config) -> Self {
        Self::with_capacity(ready, config.lock_table_capacity)
    }

    fn with_capacity(ready: ReadyQueue, capacity: usize) -> Self {
        Self {
            lock_table: HashMap::with_capacity(capacity),
            wait_counts: HashMap::new(),
            ready,
            _policy: PhantomData,
        }
    }

    /// Requests an exclusive lock on `key` for `txn`.
    ///
    /// Returns `Ok(true)` if the lock was granted immediately. Otherwise the
    /// request is queued, `txn`'s wait count is incremented and `Ok(false)`
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `txn` already has a request on
    /// `key`.
    pub fn write_lock(&mut self, txn: TransactionId, key: K) -> CoreResult<bool> {
        self.request(txn, key, LockMode::Exclusive)
    }

    /// Requests a shared lock on `key` for `txn`.
    ///
    /// Under [`ExclusiveOnly`] this behaves exactly like
    /// [`write_lock`](Self::write_lock).
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `txn` already has a request on
    /// `key`.
    pub fn read_lock(&mut self, txn: TransactionId, key: K) -> CoreResult<bool> {
        self.request(txn, key, LockMode::Shared)
    }

    fn request(&mut self, txn: TransactionId, key: K, requested: LockMode) -> CoreResult<bool> {
        let mode = P::request_mode(requested);

        if self
            .lock_table
            .get(&key)
            .is_some_and(|queue| queue.iter().any(|request| request.txn == txn))
        {
            return Err(CoreError::precondition(format!(
                "{txn} already requested a lock on {key:?}"
            )));
        }

        let queue = self.lock_table.entry(key.clone()).or_default();
        queue.push_back(LockRequest::new(mode, txn));

        if granted_prefix_len::<P>(queue) == queue.len() {
            trace!(%txn, ?key, %mode, "lock granted");
            return Ok(true);
        }

        let waiting = self.wait_counts.entry(txn).or_insert(0);
        *waiting += 1;
        debug!(%txn, ?key, %mode, waiting = *waiting, "lock request blocked");
        Ok(false)
    }

    /// Releases `txn`'s lock (or pending request) on `key`.
    ///
    /// If the released request was granted, the queue is re-evaluated and
    /// every request that now falls inside the granted prefix is granted as
    /// one batch, in queue order. Transactions whose wait count reaches zero
    /// are appended to the ready queue.
    ///
    /// Releasing a request that was still waiting withdraws it: it grants
    /// nothing to others unless removing it exposes a compatible prefix, and
    /// it lowers `txn`'s own wait count without ever making `txn` ready.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `txn` has no request on `key`, or
    /// if a request granted by this release has no wait count to settle.
    pub fn release(&mut self, txn: TransactionId, key: &K) -> CoreResult<()> {
        let queue = self.lock_table.get_mut(key).ok_or_else(|| {
            CoreError::precondition(format!("{txn} released {key:?}, which has no lock queue"))
        })?;
        let position = queue
            .iter()
            .position(|request| request.txn == txn)
            .ok_or_else(|| {
                CoreError::precondition(format!("{txn} released {key:?} without requesting it"))
            })?;

        let granted_before = granted_prefix_len::<P>(queue);
        queue.remove(position);

        let was_granted = position < granted_before;
        let still_granted = if was_granted {
            granted_before - 1
        } else {
            granted_before
        };
        let granted_after = granted_prefix_len::<P>(queue).max(still_granted);

        let woken: Vec<TransactionId> = queue
            .range(still_granted..granted_after)
            .map(|request| request.txn)
            .collect();

        if queue.is_empty() {
            self.lock_table.remove(key);
        }

        if was_granted {
            trace!(%txn, ?key, "lock released");
        } else {
            debug!(%txn, ?key, "pending lock request withdrawn");
            self.withdraw_wait(txn);
        }

        for next in woken {
            debug!(txn = %next, ?key, "lock granted on release");
            self.grant(next)?;
        }

        Ok(())
    }

    /// Reports who holds `key` and in which mode.
    ///
    /// `owners` is cleared and then filled with the granted transactions in
    /// queue order. Calling `status` does not change any state.
    pub fn status(&self, key: &K, owners: &mut Vec<TransactionId>) -> LockMode {
        owners.clear();

        let Some(queue) = self.lock_table.get(key) else {
            return LockMode::Unlocked;
        };

        let granted = granted_prefix_len::<P>(queue);
        owners.extend(queue.iter().take(granted).map(|request| request.txn));
        queue.front().map_or(LockMode::Unlocked, |head| head.mode)
    }

    /// Returns the number of `txn`'s requests that are still waiting.
    #[must_use]
    pub fn wait_count(&self, txn: TransactionId) -> usize {
        self.wait_counts.get(&txn).copied().unwrap_or(0)
    }

    /// Returns the number of requests queued on `key`, granted or not.
    #[must_use]
    pub fn queue_len(&self, key: &K) -> usize {
        self.lock_table.get(key).map_or(0, VecDeque::len)
    }

    /// Returns the number of keys with at least one request.
    #[must_use]
    pub fn locked_key_count(&self) -> usize {
        self.lock_table.len()
    }

    /// Returns the number of transactions with waiting requests.
    #[must_use]
    pub fn waiting_txn_count(&self) -> usize {
        self.wait_counts.len()
    }

    /// Returns the ready queue this manager appends to.
    #[must_use]
    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    /// Counts one grant against `txn`, waking it when nothing is left.
    fn grant(&mut self, txn: TransactionId) -> CoreResult<()> {
        let waiting = self.wait_counts.get_mut(&txn).ok_or_else(|| {
            CoreError::precondition(format!("{txn} granted without a waiting request"))
        })?;

        *waiting -= 1;
        if *waiting == 0 {
            self.wait_counts.remove(&txn);
            self.ready.push(txn);
            debug!(%txn, "transaction ready");
        }
        Ok(())
    }

    /// Drops one waiting request of `txn` without a grant.
    fn withdraw_wait(&mut self, txn: TransactionId) {
        if let Some(waiting) = self.wait_counts.get_mut(&txn) {
            *waiting -= 1;
            if *waiting == 0 {
                self.wait_counts.remove(&txn);
            }
        }
    }
}

/// Length of the longest prefix of `queue` that `P` lets hold the key.
fn granted_prefix_len<P: LockPolicy>(queue: &LockQueue) -> usize {
    let mut held = LockMode::Unlocked;
    let mut granted = 0;

    for request in queue {
        if !P::is_compatible(request.mode, held) {
            break;
        }
        held = held.max(request.mode);
        granted += 1;
    }

    granted
}

impl<K, P> fmt::Debug for LockManager<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("locked_keys", &self.lock_table.len())
            .field("waiting_txns", &self.wait_counts.len())
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}
