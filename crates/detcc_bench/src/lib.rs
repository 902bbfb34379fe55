//! Benchmark utilities.

#![warn(missing_docs)]

use detcc_core::TransactionId;
use detcc_testkit::TxnSpec;
use rand::Rng;

/// Generate `count` random keys in `0..key_count`.
pub fn random_keys(count: usize, key_count: u64) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(0..key_count)).collect()
}

/// Generate a workload of `count` transactions, each reading `reads` and
/// writing `writes` random keys in `0..key_count`.
pub fn random_workload(count: usize, key_count: u64, reads: usize, writes: usize) -> Vec<TxnSpec> {
    (0..count as u64)
        .map(|i| {
            TxnSpec::new(
                TransactionId::new(i + 1),
                random_keys(reads, key_count),
                random_keys(writes, key_count),
            )
        })
        .collect()
}
