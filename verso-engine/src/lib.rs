//! Content versioning and conflict resolution for Verso.
//!
//! Every save of a content item becomes an immutable [`Version`] in a DAG.
//! The engine decides, on each save, whether to create a version, skip it,
//! merge it with a concurrent edit, or hand it to a person.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Detector**: field-level diff, similarity score and critical-field check
//! - **Registry**: per content type merge strategies applied field by field
//! - **Scheduler**: autosave snapshot decisions and the pre-write risk check
//! - **Lineage**: ancestor walks over the version DAG
//! - **Pruner**: history retention that never touches the head
//! - **Engine**: orchestrates the above over an injected [`VersionStore`]
//!
//! ## Commit Process
//!
//! 1. **Validate**: author present, content editable, risk below threshold
//! 2. **No-op check**: a payload equal to the head writes nothing
//! 3. **Compare-and-set**: write on top of the base iff it is still the head
//! 4. **Branch**: if the head moved, keep the edit as a sibling version
//! 5. **Merge**: detect conflicts and merge automatically or report them
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use verso_engine::{EngineConfig, VersioningEngine};
//! use verso_model::Payload;
//! use verso_storage::MemoryVersionStore;
//! use verso_types::ContentId;
//!
//! # async fn demo() -> verso_engine::EngineResult<()> {
//! let engine = VersioningEngine::new(Arc::new(MemoryVersionStore::new()), EngineConfig::default());
//! let id = ContentId::new("post-1");
//! engine.register_content(&id, "article").await?;
//!
//! let payload = Payload::from_json_str(r#"{"title": "Hello"}"#)?;
//! let outcome = engine.create_version(&id, payload, "alice").await?;
//! assert!(outcome.version().is_some());
//! # Ok(())
//! # }
//! ```
//!
//! [`Version`]: verso_model::Version
//! [`VersionStore`]: verso_storage::VersionStore

mod config;
mod detector;
mod engine;
mod error;
pub mod lineage;
mod pruner;
mod registry;
mod scheduler;

pub use config::{ChangeMetric, EngineConfig};
pub use detector::{
    three_way_conflicts, ChangeKind, ConflictDetector, ConflictReport, DiffStats, FieldChange,
};
pub use engine::{CommitOutcome, MergePreview, VersioningEngine};
pub use error::{EngineError, EngineResult};
pub use pruner::RevisionPruner;
pub use registry::{merge_versions, MergeOutcome, MergeStrategyRegistry};
pub use scheduler::{
    field_ratio_change, hash_segment_change, AutoVersionScheduler, SnapshotDecision,
};
