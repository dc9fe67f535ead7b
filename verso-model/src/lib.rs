//! Content model for Verso.
//!
//! Defines the types every other layer agrees on:
//! - [`Payload`]: the structured body of a version (a JSON object)
//! - [`Version`] and [`Lineage`]: immutable snapshots and their place in the DAG
//! - [`identity`]: deterministic hashing and no-op detection
//! - [`ContentItem`] and [`ApprovalState`]: the mutable head and workflow state
//! - [`MergeStrategyRule`] and [`MergeRules`]: per content type merge rules
//! - [`RiskAnalyzer`]: the pluggable pre-write risk check

mod approval;
mod content;
mod error;
pub mod identity;
mod payload;
mod risk;
mod schema;
mod version;

pub use approval::ApprovalState;
pub use content::ContentItem;
pub use error::{ModelError, ModelResult};
pub use payload::Payload;
pub use risk::{NoRisk, RiskAnalyzer};
pub use schema::{FieldStrategy, MergeRules, MergeStrategyRule};
pub use version::{Lineage, MergeResolution, NewVersion, Version, VersionKind};
