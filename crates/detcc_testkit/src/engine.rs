//! A minimal execution engine for exercising the core.
//!
//! Transactions declare their read and write sets up front. The engine
//! requests every lock in arrival order, runs a transaction once the lock
//! manager reports it ready, performs its reads, validations and writes
//! under key guards, and finally releases its locks. A transaction whose
//! write validation fails on any key is aborted as a whole: nothing it
//! would have written is applied.
//!
//! Each transaction reads every key in its read set at its own timestamp and
//! writes `sum(reads) + id` to every key in its write set.

use detcc_core::{
    CoreError, CoreResult, KeyGuard, LockManager, LockPolicy, MvccStorage, ReadyQueue,
    TransactionId,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use tracing::debug;

/// A transaction as submitted by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnSpec {
    /// Transaction ID, also its timestamp.
    pub id: TransactionId,
    /// Keys read.
    pub read_set: BTreeSet<u64>,
    /// Keys written.
    pub write_set: BTreeSet<u64>,
}

impl TxnSpec {
    /// Creates a transaction specification.
    pub fn new(
        id: TransactionId,
        read_set: impl IntoIterator<Item = u64>,
        write_set: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            id,
            read_set: read_set.into_iter().collect(),
            write_set: write_set.into_iter().collect(),
        }
    }

    /// Returns every key the transaction touches, ascending.
    pub fn keys(&self) -> BTreeSet<u64> {
        self.read_set.union(&self.write_set).copied().collect()
    }

    /// Computes the value this transaction writes from what it read.
    #[must_use]
    pub fn output(&self, reads: &[u64]) -> u64 {
        reads
            .iter()
            .fold(self.id.as_u64(), |acc, value| acc.wrapping_add(*value))
    }
}

/// What happened to a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Committed transactions in completion order.
    pub committed: Vec<TransactionId>,
    /// Aborted transactions in completion order.
    pub aborted: Vec<TransactionId>,
}

impl ExecutionOutcome {
    /// Returns the number of finished transactions.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.committed.len() + self.aborted.len()
    }
}

/// Requests all of `spec`'s locks. Returns `true` if all were granted.
pub fn request_locks<P: LockPolicy>(
    locks: &mut LockManager<u64, P>,
    spec: &TxnSpec,
) -> CoreResult<bool> {
    let mut all_granted = true;
    for key in spec.keys() {
        let granted = if spec.write_set.contains(&key) {
            locks.write_lock(spec.id, key)?
        } else {
            locks.read_lock(spec.id, key)?
        };
        all_granted &= granted;
    }
    Ok(all_granted)
}

/// Releases all of `spec`'s locks.
pub fn release_locks<P: LockPolicy>(
    locks: &mut LockManager<u64, P>,
    spec: &TxnSpec,
) -> CoreResult<()> {
    for key in spec.keys() {
        locks.release(spec.id, &key)?;
    }
    Ok(())
}

/// Runs one transaction against `storage`. Returns `true` if it committed.
///
/// Key guards are taken in ascending key order and all released before
/// returning, on every path.
pub fn execute(storage: &MvccStorage<u64, u64>, spec: &TxnSpec) -> CoreResult<bool> {
    let keys = spec.keys();
    let mut guards: BTreeMap<u64, KeyGuard<'_, u64, u64>> = storage
        .lock_many(&keys)?
        .into_iter()
        .map(|guard| (*guard.key(), guard))
        .collect();

    let mut reads = Vec::with_capacity(spec.read_set.len());
    for key in &spec.read_set {
        if let Some(value) = guard_for(&mut guards, *key)?.read(spec.id) {
            reads.push(value);
        }
    }

    for key in &spec.write_set {
        if !guard_for(&mut guards, *key)?.check_write(spec.id) {
            debug!(txn = %spec.id, key, "transaction aborted");
            return Ok(false);
        }
    }

    let value = spec.output(&reads);
    for key in &spec.write_set {
        guard_for(&mut guards, *key)?.write(value, spec.id)?;
    }
    Ok(true)
}

fn guard_for<'g, 'a>(
    guards: &'g mut BTreeMap<u64, KeyGuard<'a, u64, u64>>,
    key: u64,
) -> CoreResult<&'g mut KeyGuard<'a, u64, u64>> {
    guards
        .get_mut(&key)
        .ok_or_else(|| CoreError::precondition(format!("key {key} was not locked")))
}

fn index_specs(specs: &[TxnSpec]) -> CoreResult<HashMap<TransactionId, &TxnSpec>> {
    let mut previous: Option<TransactionId> = None;
    let mut by_id = HashMap::with_capacity(specs.len());
    for spec in specs {
        if previous.is_some_and(|prev| spec.id <= prev) {
            return Err(CoreError::precondition(format!(
                "{} arrived after a transaction with a larger or equal id",
                spec.id
            )));
        }
        previous = Some(spec.id);
        by_id.insert(spec.id, spec);
    }
    Ok(by_id)
}

fn stalled(outcome: &ExecutionOutcome, total: usize) -> CoreError {
    CoreError::precondition(format!(
        "{} of {total} transactions never became ready",
        total - outcome.finished()
    ))
}

/// Runs `specs` to completion on one thread.
///
/// Transactions are submitted in slice order, which must be strictly
/// increasing by ID.
///
/// # Errors
///
/// Returns an error if the IDs are out of order, a core call fails, or some
/// transaction never becomes ready.
pub fn run_workload<P: LockPolicy>(
    specs: &[TxnSpec],
    storage: &MvccStorage<u64, u64>,
) -> CoreResult<ExecutionOutcome> {
    let by_id = index_specs(specs)?;
    let ready = ReadyQueue::new();
    let mut locks: LockManager<u64, P> = LockManager::new(ready.clone());
    let mut runnable = VecDeque::new();

    for spec in specs {
        if request_locks(&mut locks, spec)? {
            runnable.push_back(spec.id);
        }
    }

    let mut outcome = ExecutionOutcome::default();
    while let Some(id) = runnable.pop_front() {
        let spec = by_id[&id];
        if execute(storage, spec)? {
            outcome.committed.push(id);
        } else {
            outcome.aborted.push(id);
        }
        release_locks(&mut locks, spec)?;
        runnable.extend(ready.drain());
    }

    if outcome.finished() != specs.len() {
        return Err(stalled(&outcome, specs.len()));
    }
    Ok(outcome)
}

/// Runs `specs` to completion on `threads` worker threads.
///
/// Locks are requested up front in slice order. The lock manager sits
/// behind one coarse mutex; storage access is only serialized per key.
///
/// # Errors
///
/// Same as [`run_workload`]. The first error from any worker is returned.
pub fn run_workload_concurrent<P: LockPolicy + Send>(
    specs: &[TxnSpec],
    storage: &MvccStorage<u64, u64>,
    threads: usize,
) -> CoreResult<ExecutionOutcome> {
    let by_id = index_specs(specs)?;
    let ready = ReadyQueue::new();
    let mut manager: LockManager<u64, P> = LockManager::new(ready.clone());
    let mut initial = VecDeque::new();

    for spec in specs {
        if request_locks(&mut manager, spec)? {
            initial.push_back(spec.id);
        }
    }

    let locks = Mutex::new(manager);
    let runnable = Mutex::new(initial);
    let outcome = Mutex::new(ExecutionOutcome::default());
    let finished = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let total = specs.len();

    let worker = || -> CoreResult<()> {
        while finished.load(Ordering::Acquire) < total && !failed.load(Ordering::Acquire) {
            let next = runnable.lock().pop_front();
            let Some(id) = next else {
                thread::yield_now();
                continue;
            };

            let spec = by_id[&id];
            let result = execute(storage, spec).and_then(|committed| {
                let mut locks = locks.lock();
                release_locks(&mut locks, spec)?;
                runnable.lock().extend(ready.drain());
                Ok(committed)
            });

            match result {
                Ok(true) => outcome.lock().committed.push(id),
                Ok(false) => outcome.lock().aborted.push(id),
                Err(err) => {
                    failed.store(true, Ordering::Release);
                    return Err(err);
                }
            }
            finished.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    };

    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads.max(1)).map(|_| scope.spawn(worker)).collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread panicked"))
            .collect::<CoreResult<()>>()
    })?;

    let outcome = outcome.into_inner();
    if outcome.finished() != total {
        return Err(stalled(&outcome, total));
    }
    Ok(outcome)
}

/// Returns the value of every key as visible at `at`, without recording
/// a read.
pub fn snapshot(storage: &MvccStorage<u64, u64>, keys: u64, at: TransactionId) -> Vec<Option<u64>> {
    (0..keys)
        .map(|key| {
            storage
                .lock(&key)
                .ok()
                .and_then(|guard| guard.history().visible(at).map(|version| *version.value()))
        })
        .collect()
}
