//! Stress tests for detcc.
//!
//! These runs push many transactions through the lock manager and the
//! storage engine, with and without concurrency, and report throughput.

use crate::engine::{run_workload, run_workload_concurrent, TxnSpec};
use detcc_core::{CoreResult, LockPolicy, MvccStorage, TransactionId};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total transactions attempted.
    pub total_ops: usize,
    /// Committed transactions.
    pub successful_ops: usize,
    /// Aborted transactions.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Transactions per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total transactions: {}", self.total_ops);
        println!("Committed: {}", self.successful_ops);
        println!("Aborted: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} txn/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of transactions to run.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of distinct keys.
    pub key_count: u64,
    /// Keys touched by each transaction.
    pub keys_per_txn: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            key_count: 1_000,
            keys_per_txn: 4,
        }
    }
}

impl StressConfig {
    /// Builds a deterministic workload: transaction `i` reads
    /// `keys_per_txn` spread-out keys and writes the first of them.
    pub fn workload(&self) -> Vec<TxnSpec> {
        let key_count = self.key_count.max(1);
        (0..self.operations as u64)
            .map(|i| {
                let keys: Vec<u64> = (0..self.keys_per_txn.max(1) as u64)
                    .map(|j| (i * 7 + j * 13) % key_count)
                    .collect();
                TxnSpec::new(TransactionId::new(i + 1), keys.clone(), keys.first().copied())
            })
            .collect()
    }
}

/// Runs the configured workload under two-phase locking on one thread.
///
/// # Errors
///
/// Returns an error if a core call fails.
pub fn stress_locked_sequential<P: LockPolicy>(
    storage: &MvccStorage<u64, u64>,
    config: &StressConfig,
) -> CoreResult<StressTestResult> {
    let workload = config.workload();
    let start = Instant::now();
    let outcome = run_workload::<P>(&workload, storage)?;
    Ok(StressTestResult::new(
        outcome.committed.len(),
        outcome.aborted.len(),
        start.elapsed(),
    ))
}

/// Runs the configured workload under two-phase locking on
/// `config.threads` workers.
///
/// # Errors
///
/// Returns an error if a core call fails.
pub fn stress_locked_concurrent<P: LockPolicy + Send>(
    storage: &MvccStorage<u64, u64>,
    config: &StressConfig,
) -> CoreResult<StressTestResult> {
    let workload = config.workload();
    let start = Instant::now();
    let outcome = run_workload_concurrent::<P>(&workload, storage, config.threads)?;
    Ok(StressTestResult::new(
        outcome.committed.len(),
        outcome.aborted.len(),
        start.elapsed(),
    ))
}

/// Runs unlocked increment transactions straight against storage.
///
/// Without the lock manager, transaction IDs reach the storage engine out
/// of order, so timestamp validation rejects some writes. Each transaction
/// reads one key and writes the value plus one, so after the run every
/// key holds exactly the number of committed increments on it.
pub fn stress_mvcc_increments(
    storage: &MvccStorage<u64, u64>,
    config: &StressConfig,
) -> StressTestResult {
    let next_id = AtomicU64::new(1);
    let committed = AtomicUsize::new(0);
    let aborted = AtomicUsize::new(0);
    let threads = config.threads.max(1);
    let per_thread = config.operations / threads;
    let key_count = config.key_count.max(1);

    let start = Instant::now();
    thread::scope(|scope| {
        for t in 0..threads {
            let next_id = &next_id;
            let committed = &committed;
            let aborted = &aborted;
            scope.spawn(move || {
                for i in 0..per_thread {
                    let id = TransactionId::new(next_id.fetch_add(1, Ordering::Relaxed));
                    let key = ((t * per_thread + i) as u64 * 31) % key_count;

                    let Ok(mut guard) = storage.lock(&key) else {
                        aborted.fetch_add(1, Ordering::Relaxed);
                        continue;
                    };
                    let current = guard.read(id).unwrap_or(0);
                    if guard.check_write(id) && guard.write(current + 1, id).is_ok() {
                        committed.fetch_add(1, Ordering::Relaxed);
                    } else {
                        aborted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    StressTestResult::new(
        committed.load(Ordering::Relaxed),
        aborted.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Sums (wrapping) the latest value of every key in `0..key_count`.
pub fn latest_total(storage: &MvccStorage<u64, u64>, key_count: u64) -> u64 {
    crate::engine::snapshot(storage, key_count, TransactionId::new(u64::MAX))
        .into_iter()
        .flatten()
        .fold(0, u64::wrapping_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seeded_storage;
    use crate::init_tracing;
    use detcc_core::{ExclusiveOnly, SharedExclusive};

    fn small_config() -> StressConfig {
        StressConfig {
            operations: 1_000,
            threads: 4,
            key_count: 64,
            keys_per_txn: 3,
        }
    }

    #[test]
    fn test_locked_sequential_exclusive() {
        init_tracing();
        let config = small_config();
        let storage = seeded_storage(config.key_count);

        let result = stress_locked_sequential::<ExclusiveOnly>(&storage, &config).unwrap();
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_000);
    }

    #[test]
    fn test_locked_sequential_shared() {
        let config = small_config();
        let storage = seeded_storage(config.key_count);

        let result = stress_locked_sequential::<SharedExclusive>(&storage, &config).unwrap();
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, 1_000);
    }

    #[test]
    fn test_locked_concurrent() {
        let config = small_config();
        let storage = seeded_storage(config.key_count);

        let result = stress_locked_concurrent::<SharedExclusive>(&storage, &config).unwrap();
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_000);
    }

    #[test]
    fn test_locked_runs_agree() {
        let config = small_config();
        let sequential = seeded_storage(config.key_count);
        let concurrent = seeded_storage(config.key_count);

        stress_locked_sequential::<SharedExclusive>(&sequential, &config).unwrap();
        stress_locked_concurrent::<SharedExclusive>(&concurrent, &config).unwrap();
        assert_eq!(
            latest_total(&sequential, config.key_count),
            latest_total(&concurrent, config.key_count)
        );
    }

    #[test]
    fn test_mvcc_increments_are_exact() {
        let config = small_config();
        let mut storage = seeded_storage(config.key_count);

        let result = stress_mvcc_increments(&storage, &config);
        assert_eq!(result.total_ops, 1_000);
        assert_eq!(
            latest_total(&storage, config.key_count),
            result.successful_ops as u64
        );

        let stats = storage.stats();
        assert_eq!(
            stats.versions,
            config.key_count as usize + result.successful_ops
        );
    }

    #[test]
    fn test_single_thread_increments_never_abort() {
        let config = StressConfig {
            threads: 1,
            ..small_config()
        };
        let storage = seeded_storage(config.key_count);

        let result = stress_mvcc_increments(&storage, &config);
        assert_eq!(result.failed_ops, 0);
    }
}
