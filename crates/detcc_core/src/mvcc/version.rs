//! Versions and per-key version histories.

use crate::types::TransactionId;
use std::collections::VecDeque;

/// One value of a key, as written by one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version<V> {
    writer_ts: TransactionId,
    value: V,
    max_reader_ts: TransactionId,
}

impl<V> Version<V> {
    /// Creates a version written at `writer_ts` that nobody has read yet.
    #[must_use]
    pub fn new(writer_ts: TransactionId, value: V) -> Self {
        Self {
            writer_ts,
            value,
            max_reader_ts: TransactionId::ZERO,
        }
    }

    /// Returns the ID of the transaction that wrote this version.
    #[must_use]
    pub fn writer_ts(&self) -> TransactionId {
        self.writer_ts
    }

    /// Returns the highest transaction ID that has read this version.
    #[must_use]
    pub fn max_reader_ts(&self) -> TransactionId {
        self.max_reader_ts
    }

    /// Returns the stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    fn record_read(&mut self, reader: TransactionId) {
        self.max_reader_ts = self.max_reader_ts.max(reader);
    }
}

/// All versions of one key, most recent insertion first.
///
/// The history is not sorted by timestamp; lookups scan it. Versions are
/// never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHistory<V> {
    versions: VecDeque<Version<V>>,
}

impl<V> Default for VersionHistory<V> {
    fn default() -> Self {
        Self {
            versions: VecDeque::new(),
        }
    }
}

impl<V> VersionHistory<V> {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `version` in front of every existing version.
    pub fn push(&mut self, version: Version<V>) {
        self.versions.push_front(version);
    }

    /// Returns the version visible at `ts`, if any.
    ///
    /// That is the version with the greatest writer timestamp `<= ts`. Among
    /// versions with equal timestamps the most recent insertion wins.
    #[must_use]
    pub fn visible(&self, ts: TransactionId) -> Option<&Version<V>> {
        let mut candidate: Option<&Version<V>> = None;
        for version in &self.versions {
            if version.writer_ts <= ts
                && candidate.is_none_or(|best| version.writer_ts > best.writer_ts)
            {
                candidate = Some(version);
            }
        }
        candidate
    }

    /// Reads the version visible at `ts` and records `ts` as a reader.
    ///
    /// Returns `None` without touching any version if nothing was written
    /// at or before `ts`.
    pub fn read(&mut self, ts: TransactionId) -> Option<&V> {
        let mut candidate: Option<&mut Version<V>> = None;
        for version in &mut self.versions {
            if version.writer_ts <= ts
                && candidate
                    .as_ref()
                    .is_none_or(|best| version.writer_ts > best.writer_ts)
            {
                candidate = Some(version);
            }
        }

        let version = candidate?;
        version.record_read(ts);
        Some(&version.value)
    }

    /// Checks whether a write at `ts` keeps timestamp order.
    ///
    /// Fails if some version was written after `ts`, or if some version was
    /// read by a transaction later than `ts`.
    #[must_use]
    pub fn accepts_write(&self, ts: TransactionId) -> bool {
        self.versions
            .iter()
            .all(|version| version.writer_ts <= ts && version.max_reader_ts <= ts)
    }

    /// Returns the number of versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Checks if the key was never written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterates over versions, most recent insertion first.
    pub fn iter(&self) -> impl Iterator<Item = &Version<V>> {
        self.versions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(id: u64) -> TransactionId {
        TransactionId::new(id)
    }

    fn history(writes: &[(u64, &'static str)]) -> VersionHistory<&'static str> {
        let mut history = VersionHistory::new();
        for &(writer, value) in writes {
            history.push(Version::new(ts(writer), value));
        }
        history
    }

    #[test]
    fn empty_history_has_nothing_visible() {
        let mut history: VersionHistory<u8> = VersionHistory::new();
        assert!(history.visible(ts(10)).is_none());
        assert!(history.read(ts(10)).is_none());
        assert!(history.accepts_write(ts(1)));
    }

    #[test]
    fn read_picks_latest_visible_version() {
        let mut history = history(&[(10, "v2"), (5, "v1")]);
        assert_eq!(history.read(ts(7)), Some(&"v1"));
        assert_eq!(history.read(ts(12)), Some(&"v2"));
        assert_eq!(history.read(ts(3)), None);
    }

    #[test]
    fn read_miss_leaves_versions_untouched() {
        let mut history = history(&[(5, "v1")]);
        let before = history.clone();
        assert!(history.read(ts(4)).is_none());
        assert_eq!(history, before);
    }

    #[test]
    fn max_reader_never_decreases() {
        let mut history = history(&[(5, "v1")]);
        history.read(ts(20));
        history.read(ts(8));
        assert_eq!(history.visible(ts(20)).unwrap().max_reader_ts(), ts(20));
    }

    #[test]
    fn latest_insertion_wins_on_equal_timestamps() {
        let mut history = history(&[(5, "first"), (5, "second")]);
        assert_eq!(history.read(ts(5)), Some(&"second"));
    }

    #[test]
    fn newer_write_rejects_older_writer() {
        let history = history(&[(10, "v")]);
        assert!(!history.accepts_write(ts(9)));
        assert!(history.accepts_write(ts(10)));
        assert!(history.accepts_write(ts(11)));
    }

    #[test]
    fn later_reader_rejects_older_writer() {
        let mut history = history(&[(10, "v")]);
        history.read(ts(20));
        assert!(!history.accepts_write(ts(15)));
        assert!(history.accepts_write(ts(20)));
    }

    proptest! {
        #[test]
        fn read_matches_greatest_visible_timestamp(
            writers in prop::collection::hash_set(1u64..200, 0..20),
            reader in 0u64..220,
        ) {
            let writers: Vec<u64> = writers.into_iter().collect();
            let mut history = VersionHistory::new();
            for &writer in &writers {
                history.push(Version::new(ts(writer), writer * 10));
            }

            let expected = writers.iter().copied().filter(|&w| w <= reader).max();
            prop_assert_eq!(history.read(ts(reader)).copied(), expected.map(|w| w * 10));
        }
    }
}
