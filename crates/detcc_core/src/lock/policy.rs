//! Lock compatibility policies.

use super::mode::LockMode;

/// Decides which requests may share a key.
///
/// A policy sees the combined mode of the requests already granted on a key
/// ([`LockMode::Unlocked`] when none are) and answers whether a request in
/// the proposed mode may join them. Policies must be pure: the answer may
/// depend on the two modes only.
///
/// Policies must also be monotone in `held`: a request compatible with a
/// stronger held mode stays compatible with any weaker one. Otherwise a
/// release can shrink the granted prefix, and requests that already hold the
/// key are not revoked.
pub trait LockPolicy {
    /// Maps the mode a caller asked for to the mode recorded in the queue.
    fn request_mode(requested: LockMode) -> LockMode;

    /// Returns `true` if `proposed` can be granted alongside `held`.
    fn is_compatible(proposed: LockMode, held: LockMode) -> bool;
}

/// Every lock is exclusive; read locks are recorded as write locks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveOnly;

impl LockPolicy for ExclusiveOnly {
    fn request_mode(_requested: LockMode) -> LockMode {
        LockMode::Exclusive
    }

    fn is_compatible(_proposed: LockMode, held: LockMode) -> bool {
        held == LockMode::Unlocked
    }
}

/// Shared locks coexist with each other; exclusive locks stand alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedExclusive;

impl LockPolicy for SharedExclusive {
    fn request_mode(requested: LockMode) -> LockMode {
        requested
    }

    fn is_compatible(proposed: LockMode, held: LockMode) -> bool {
        matches!(
            (proposed, held),
            (_, LockMode::Unlocked) | (LockMode::Shared, LockMode::Shared)
        )
    }
}
