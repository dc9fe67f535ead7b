//! Error types for the versioning engine.

use crate::ConflictReport;
use thiserror::Error;
use verso_model::{ApprovalState, ModelError};
use verso_storage::StorageError;
use verso_types::{ContentId, VersionId};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

fn head_label(head: &Option<VersionId>) -> String {
    head.as_ref()
        .map_or_else(|| "<none>".to_string(), |id| id.short().to_string())
}

fn summarize(report: &ConflictReport) -> String {
    format!(
        "similarity {:.1}, critical fields {:?}",
        report.similarity_score, report.critical_conflicts
    )
}

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input: bad payload, unknown name, unrelated versions.
    #[error("validation error: {0}")]
    Validation(String),

    /// The head moved underneath a compare-and-set. Re-read and retry.
    #[error(
        "version conflict on {content_id}: expected head {}, found {}",
        head_label(.expected),
        head_label(.actual)
    )]
    VersionConflict {
        content_id: ContentId,
        expected: Option<VersionId>,
        actual: Option<VersionId>,
    },

    /// The approval table does not allow this change. Nothing was modified.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ApprovalState,
        to: ApprovalState,
    },

    /// Versions cannot be committed in the content's current state.
    #[error("content {content_id} is {state} and cannot be edited")]
    NotEditable {
        content_id: ContentId,
        state: ApprovalState,
    },

    /// The risk analyzer blocked the write.
    #[error("content blocked: risk score {score:.2} exceeds threshold")]
    HighRiskContent { score: f64 },

    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    /// Compare-and-set kept failing.
    #[error("conflict persisted after {attempts} attempts")]
    PersistentConflict { attempts: u32 },

    /// The two versions cannot be merged without a person.
    #[error("manual resolution required: {}", summarize(.report))]
    ManualResolutionRequired { report: Box<ConflictReport> },

    /// Unknown content item or version.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict {
                content_id,
                expected,
                actual,
            } => Self::VersionConflict {
                content_id,
                expected,
                actual,
            },
            StorageError::Locked { content_id, state } => Self::NotEditable { content_id, state },
            StorageError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other),
        }
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other => Self::Validation(other.to_string()),
        }
    }
}
