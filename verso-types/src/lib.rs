//! Core type definitions for Verso.
//!
//! This crate defines the fundamental types shared by every other crate in
//! the workspace:
//! - Content, version and replica identifiers
//! - Hybrid Logical Clock timestamps
//! - The [`Clock`] collaborator used for `created_at` and CRDT stamps
//!
//! Payload structure, versions and merge rules live in `verso-model`.

mod clock;
mod ids;
mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{ContentId, ReplicaId, VersionId};
pub use timestamp::HybridTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid version id: {0:?}")]
    InvalidVersionId(String),
}
