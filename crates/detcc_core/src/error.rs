//! Error types for detcc core.
//!
//! Blocked lock requests and failed write validations are ordinary `bool`
//! results, not errors. Errors are reserved for contract violations by the
//! caller, which must fail fast instead of corrupting shared tables.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller broke the calling contract of a lock or storage operation.
    PreconditionViolation,
    /// A configuration value was rejected.
    InvalidConfig,
}

/// Errors that can occur in detcc core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lock-manager or storage call violated its precondition.
    #[error("precondition violation: {message}")]
    PreconditionViolation {
        /// Description of the violated contract.
        message: String,
    },

    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the rejected setting.
        message: String,
    },
}

impl CoreError {
    /// Creates a precondition violation error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionViolation { .. } => ErrorKind::PreconditionViolation,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_message() {
        let err = CoreError::precondition("release of unknown key");
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert_eq!(
            err.to_string(),
            "precondition violation: release of unknown key"
        );
    }

    #[test]
    fn invalid_config_kind() {
        let err = CoreError::invalid_config("keyspace_size must be non-zero");
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }
}
