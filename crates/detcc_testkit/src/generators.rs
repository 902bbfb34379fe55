//! Property-based test generators using proptest.
//!
//! Provides strategies for generating transaction workloads whose IDs are
//! strictly increasing, the way a sequencer would hand them out.

use crate::engine::TxnSpec;
use detcc_core::{LockMode, TransactionId};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

/// Strategy for a lock mode a caller may request.
pub fn requested_mode_strategy() -> impl Strategy<Value = LockMode> {
    prop_oneof![Just(LockMode::Shared), Just(LockMode::Exclusive)]
}

/// Strategy for the read and write sets of one transaction over
/// `0..key_count`. The ID is left at zero.
pub fn txn_spec_strategy(key_count: u64, max_keys: usize) -> impl Strategy<Value = TxnSpec> {
    let key_count = key_count.max(1);
    let max_keys = max_keys.max(1);
    (
        prop::collection::btree_set(0..key_count, 0..=max_keys),
        prop::collection::btree_set(0..key_count, 0..=max_keys),
    )
        .prop_filter("transaction must touch at least one key", |(reads, writes)| {
            !reads.is_empty() || !writes.is_empty()
        })
        .prop_map(|(read_set, write_set)| TxnSpec {
            id: TransactionId::ZERO,
            read_set,
            write_set,
        })
}

/// Strategy for a workload of up to `max_txns` transactions with IDs
/// `1, 2, 3, ...` in submission order.
pub fn workload_strategy(
    key_count: u64,
    max_keys: usize,
    max_txns: usize,
) -> impl Strategy<Value = Vec<TxnSpec>> {
    prop::collection::vec(txn_spec_strategy(key_count, max_keys), 1..=max_txns.max(1)).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, spec)| TxnSpec {
                    id: TransactionId::new(i as u64 + 1),
                    ..spec
                })
                .collect()
        },
    )
}

/// Strategy for `(writer, value)` pairs with distinct writer timestamps,
/// ascending by writer.
pub fn version_writes_strategy(max_versions: usize) -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::btree_map(1u64..1_000, any::<u64>(), 0..=max_versions)
        .prop_map(|writes| writes.into_iter().collect())
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{run_workload, run_workload_concurrent, snapshot};
    use crate::fixtures::{empty_storage, seeded_storage, shared_manager, txn};
    use detcc_core::{ExclusiveOnly, SharedExclusive};
    use std::collections::BTreeSet;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn workload_ids_strictly_increase(specs in workload_strategy(8, 3, 16)) {
            for pair in specs.windows(2) {
                prop_assert!(pair[0].id < pair[1].id);
            }
            prop_assert!(specs.iter().all(|spec| !spec.keys().is_empty()));
        }

        #[test]
        fn every_txn_finishes_once(specs in workload_strategy(6, 3, 24)) {
            let storage = seeded_storage(6);
            let outcome = run_workload::<SharedExclusive>(&specs, &storage).unwrap();

            let ids: BTreeSet<_> = outcome.committed.iter().copied().collect();
            prop_assert_eq!(outcome.committed.len(), specs.len());
            prop_assert_eq!(ids.len(), specs.len());
            prop_assert!(outcome.aborted.is_empty());
        }

        #[test]
        fn final_state_independent_of_policy(specs in workload_strategy(6, 3, 24)) {
            let exclusive = seeded_storage(6);
            let shared = seeded_storage(6);
            run_workload::<ExclusiveOnly>(&specs, &exclusive).unwrap();
            run_workload::<SharedExclusive>(&specs, &shared).unwrap();

            let at = TransactionId::new(u64::MAX);
            prop_assert_eq!(snapshot(&exclusive, 6, at), snapshot(&shared, 6, at));
        }

        #[test]
        fn concurrent_execution_is_deterministic(specs in workload_strategy(6, 3, 24)) {
            let sequential = seeded_storage(6);
            let concurrent = seeded_storage(6);
            run_workload::<SharedExclusive>(&specs, &sequential).unwrap();
            run_workload_concurrent::<SharedExclusive>(&specs, &concurrent, 3).unwrap();

            let at = TransactionId::new(u64::MAX);
            prop_assert_eq!(snapshot(&sequential, 6, at), snapshot(&concurrent, 6, at));
        }

        #[test]
        fn ascending_writes_always_validate(writes in version_writes_strategy(16)) {
            let storage = empty_storage(1);
            let mut guard = storage.lock(&0).unwrap();
            for &(writer, value) in &writes {
                prop_assert!(guard.check_write(TransactionId::new(writer)));
                guard.write(value, TransactionId::new(writer)).unwrap();
            }
            for &(writer, value) in &writes {
                prop_assert_eq!(guard.read(TransactionId::new(writer)), Some(value));
            }
        }

        #[test]
        fn single_key_grants_follow_compatibility(
            modes in prop::collection::vec(requested_mode_strategy(), 1..12),
        ) {
            let (mut lm, _ready) = shared_manager();
            let mut only_shared_ahead = true;
            for (i, mode) in modes.iter().enumerate() {
                let id = txn(i as u64 + 1);
                let (granted, expected) = if *mode == LockMode::Shared {
                    (lm.read_lock(id, 0).unwrap(), only_shared_ahead)
                } else {
                    (lm.write_lock(id, 0).unwrap(), i == 0)
                };
                prop_assert_eq!(granted, expected);
                only_shared_ahead &= *mode == LockMode::Shared;
            }
        }
    }
}
