//! Error types for the sync engine.

use feedsync_protocol::{Action, ProtocolError};
use feedsync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Connection-level failures persisted through every attempt.
    #[error("{action} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// The action being called.
        action: Action,
        /// Number of attempts made.
        attempts: u32,
        /// Last failure message.
        message: String,
    },

    /// Malformed message or payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The feeder reported an application error.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Application error code.
        code: i64,
        /// Application error description.
        message: String,
    },

    /// Dependency data is missing; raised before any remote call.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The feeder returned no record where one was required.
    #[error("{action} returned no record for {key}")]
    MissingRemoteRecord {
        /// The action called.
        action: Action,
        /// The looked-up key.
        key: String,
    },

    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Credentials could not be produced.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// A row could not be mapped.
    #[error("cannot map `{field}`: {message}")]
    Mapping {
        /// Field being mapped.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// No resource has the given name.
    #[error("unknown resource `{0}`")]
    UnknownResource(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a mapping error.
    pub fn mapping(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport {
                retryable: true,
                ..
            }
        )
    }

    /// Returns true if the error must abort the whole step even when it
    /// happens while processing a single item.
    pub fn aborts_step(&self) -> bool {
        matches!(
            self,
            SyncError::AuthenticationFailed(_)
                | SyncError::Credentials(_)
                | SyncError::Precondition(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("bad request").is_retryable());
        assert!(!SyncError::Remote {
            code: 1,
            message: "x".into()
        }
        .is_retryable());
        assert!(!SyncError::Precondition("empty".into()).is_retryable());
    }

    #[test]
    fn step_aborting_errors() {
        assert!(SyncError::AuthenticationFailed("denied".into()).aborts_step());
        assert!(SyncError::Credentials("no key".into()).aborts_step());
        assert!(!SyncError::transport_retryable("reset").aborts_step());
        assert!(!SyncError::Remote {
            code: 7,
            message: "x".into()
        }
        .aborts_step());
    }

    #[test]
    fn error_display() {
        let err = SyncError::RetriesExhausted {
            action: Action::Programs,
            attempts: 3,
            message: "refused".into(),
        };
        assert_eq!(err.to_string(), "GetProdi failed after 3 attempts: refused");

        let err = SyncError::Remote {
            code: 104,
            message: "Token expired".into(),
        };
        assert_eq!(err.to_string(), "remote error 104: Token expired");
    }
}
