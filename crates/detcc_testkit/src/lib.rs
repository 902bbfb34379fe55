//! # detcc Testkit
//!
//! Test utilities for detcc.
//!
//! This crate provides:
//! - Fixtures for lock managers, ready queues and seeded storage
//! - Property-based test generators using proptest
//! - A small deterministic execution engine driving both core components
//! - Stress testing utilities
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use detcc_testkit::prelude::*;
//!
//! #[test]
//! fn every_transaction_commits() {
//!     init_tracing();
//!     let workload = vec![
//!         TxnSpec::new(txn(1), [0, 1], [1]),
//!         TxnSpec::new(txn(2), [1], [0]),
//!     ];
//!     let storage = seeded_storage(2);
//!     let outcome = run_workload::<SharedExclusive>(&workload, &storage).unwrap();
//!     assert!(outcome.aborted.is_empty());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod fixtures;
pub mod generators;
pub mod stress;

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::stress::*;
    pub use detcc_core::{ExclusiveOnly, LockMode, SharedExclusive, TransactionId};
}

pub use engine::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;

/// Installs a test-friendly tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Calling this
/// more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
