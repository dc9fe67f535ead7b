use crate::{identity, FieldStrategy, Payload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use verso_types::{ContentId, HybridTimestamp, VersionId};

/// How a merge version's payload was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MergeResolution {
    /// Computed by the strategy registry. Records the strategy applied to
    /// every field that needed one.
    Automatic {
        strategies: BTreeMap<String, FieldStrategy>,
    },
    /// Supplied by a person resolving the conflict.
    Manual,
}

/// Where a version sits in the content's DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Lineage {
    /// First version of a content item.
    Root,
    /// Ordinary commit on top of one parent.
    Parent { parent: VersionId },
    /// Join of two diverged versions. `parents[0]` is the head the merge was
    /// committed on, `parents[1]` the version merged into it.
    Merge {
        parents: [VersionId; 2],
        resolution: MergeResolution,
    },
}

impl Lineage {
    /// Lineage for a commit on top of `head`, or a root if there is none.
    #[must_use]
    pub fn on_top_of(head: Option<&VersionId>) -> Self {
        match head {
            Some(parent) => Self::Parent {
                parent: parent.clone(),
            },
            None => Self::Root,
        }
    }

    /// Zero, one or two parent ids.
    #[must_use]
    pub fn parents(&self) -> &[VersionId] {
        match self {
            Self::Root => &[],
            Self::Parent { parent } => std::slice::from_ref(parent),
            Self::Merge { parents, .. } => parents.as_slice(),
        }
    }

    #[must_use]
    pub fn is_merge(&self) -> bool {
        matches!(self, Self::Merge { .. })
    }
}

/// What kind of action created a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Edit,
    Autosave,
    /// Rollback: the payload was copied from `source`.
    Restore { source: VersionId },
    Merge,
}

impl VersionKind {
    /// Short label used in listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Autosave => "autosave",
            Self::Restore { .. } => "restore",
            Self::Merge => "merge",
        }
    }
}

/// An immutable snapshot of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub version_id: VersionId,
    pub content_id: ContentId,
    pub lineage: Lineage,
    pub payload: Payload,
    /// Digest of `payload` alone.
    pub content_hash: String,
    pub author: String,
    pub created_at: HybridTimestamp,
    /// Per-content commit counter, starting at 1. Shown as the version number.
    pub sequence: u64,
    pub kind: VersionKind,
}

impl Version {
    #[must_use]
    pub fn parents(&self) -> &[VersionId] {
        self.lineage.parents()
    }
}

/// A version that has not been stored yet.
///
/// Identity is computed on construction. The store assigns the sequence
/// number when the version is written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub version_id: VersionId,
    pub content_id: ContentId,
    pub lineage: Lineage,
    pub payload: Payload,
    pub content_hash: String,
    pub author: String,
    pub created_at: HybridTimestamp,
    pub kind: VersionKind,
}

impl NewVersion {
    #[must_use]
    pub fn new(
        content_id: ContentId,
        lineage: Lineage,
        payload: Payload,
        author: impl Into<String>,
        created_at: HybridTimestamp,
        kind: VersionKind,
    ) -> Self {
        let content_hash = identity::content_hash(&payload);
        let version_id = identity::version_id(&content_id, lineage.parents(), &content_hash);
        Self {
            version_id,
            content_id,
            lineage,
            payload,
            content_hash,
            author: author.into(),
            created_at,
            kind,
        }
    }

    #[must_use]
    pub fn parents(&self) -> &[VersionId] {
        self.lineage.parents()
    }

    /// Finalises the version with its store-assigned sequence number.
    #[must_use]
    pub fn into_version(self, sequence: u64) -> Version {
        Version {
            version_id: self.version_id,
            content_id: self.content_id,
            lineage: self.lineage,
            payload: self.payload,
            content_hash: self.content_hash,
            author: self.author,
            created_at: self.created_at,
            sequence,
            kind: self.kind,
        }
    }
}
