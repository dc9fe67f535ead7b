//! Error types for the storage layer.

use thiserror::Error;
use verso_model::ApprovalState;
use verso_types::{ContentId, VersionId};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

fn head_label(head: &Option<VersionId>) -> String {
    head.as_ref()
        .map_or_else(|| "<none>".to_string(), |id| id.short().to_string())
}

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The head pointer was not where the writer expected it.
    #[error(
        "head of {content_id} moved: expected {}, found {}",
        head_label(.expected),
        head_label(.actual)
    )]
    Conflict {
        content_id: ContentId,
        expected: Option<VersionId>,
        actual: Option<VersionId>,
    },

    /// The approval state was not what the writer expected.
    #[error("approval state of {content_id} is {actual}, expected {expected}")]
    StateConflict {
        content_id: ContentId,
        expected: ApprovalState,
        actual: ApprovalState,
    },

    /// The item's approval state does not accept new head versions.
    #[error("{content_id} is {state} and accepts no new versions")]
    Locked {
        content_id: ContentId,
        state: ApprovalState,
    },

    /// Content item or version not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The current head cannot be deleted.
    #[error("version {0} is the current head")]
    HeadProtected(VersionId),

    /// A content item with this id already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Stored or supplied data is inconsistent.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("connection lock poisoned")]
    LockPoisoned,

    /// A blocking database task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
