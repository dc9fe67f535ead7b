//! Error types for the content model.

use crate::ApprovalState;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or validating model values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Payloads must be JSON objects.
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The approval table does not allow this change.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ApprovalState,
        to: ApprovalState,
    },

    /// Unrecognised approval state name.
    #[error("unknown approval state: {0:?}")]
    UnknownState(String),

    /// Unrecognised merge strategy name.
    #[error("unknown merge strategy: {0:?}")]
    UnknownStrategy(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
