//! Error types for store operations.

use crate::kind::EntityKind;
use crate::types::{LocalId, NaturalKey};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same natural key already exists.
    #[error("duplicate {kind} key {key}")]
    DuplicateKey {
        /// Entity kind.
        kind: EntityKind,
        /// The conflicting key.
        key: NaturalKey,
    },

    /// No record has the given local id.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind.
        kind: EntityKind,
        /// The missing id.
        id: LocalId,
    },

    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
