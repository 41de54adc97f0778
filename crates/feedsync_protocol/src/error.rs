//! Error types for the feeder protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding, decoding or reading messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The message does not have the expected shape.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// A required field is absent or empty.
    #[error("missing field `{0}`")]
    MissingField(String),

    /// A field is present but cannot be interpreted.
    #[error("invalid field `{field}`: {message}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What was wrong with the value.
        message: String,
    },
}

impl ProtocolError {
    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
