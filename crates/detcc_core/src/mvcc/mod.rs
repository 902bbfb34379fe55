//! Multi-version storage with timestamp ordering.
//!
//! Each key keeps every version ever written to it, tagged with the writer's
//! transaction ID. A transaction reading at logical time `t` sees the
//! version with the greatest writer timestamp `<= t`, and leaves its
//! timestamp behind as the version's highest reader. A write at `t` is only
//! accepted if no version was written after `t` and no version was read by a
//! transaction later than `t`.
//!
//! The engine does no locking inside reads or writes. Callers take a
//! [`KeyGuard`] with [`MvccStorage::lock`] and hold it across the whole
//! read/validate/write sequence for that key.

mod storage;
mod version;

pub use storage::{KeyGuard, MvccStorage, StorageStats};
pub use version::{Version, VersionHistory};
