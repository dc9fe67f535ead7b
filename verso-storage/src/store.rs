use crate::StorageResult;
use async_trait::async_trait;
use verso_model::{ApprovalState, ContentItem, NewVersion, Version};
use verso_types::{ContentId, VersionId};

/// Append-only storage of immutable versions plus one mutable head pointer
/// and approval state per content item.
///
/// Implementations must make `put` an atomic compare-and-set on the head and
/// `set_approval_state` an atomic compare-and-set on the state. Versions are
/// keyed by their content-derived id, so writing a version whose id already
/// exists stores nothing new and returns the existing row.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Registers a new content item in `Draft` with no head.
    async fn create_item(&self, content_id: &ContentId, content_type: &str)
        -> StorageResult<ContentItem>;

    /// Returns the item, or `None` if it was never created.
    async fn item(&self, content_id: &ContentId) -> StorageResult<Option<ContentItem>>;

    /// Moves the approval state from `expected` to `next`.
    ///
    /// Fails with `StateConflict` if the state is no longer `expected`. Does
    /// not validate the transition itself.
    async fn set_approval_state(
        &self,
        content_id: &ContentId,
        expected: ApprovalState,
        next: ApprovalState,
    ) -> StorageResult<ContentItem>;

    /// Stores `version` and moves the head to it, iff the head is currently
    /// `expected_parent` (`None` meaning no head yet).
    ///
    /// Fails with `Conflict` otherwise, storing nothing. Fails with `Locked`
    /// if the item's approval state is not editable; the state check and the
    /// head swap are one atomic step. Every parent must already exist.
    async fn put(
        &self,
        version: NewVersion,
        expected_parent: Option<&VersionId>,
    ) -> StorageResult<Version>;

    /// Stores `version` without touching the head.
    async fn insert_branch(&self, version: NewVersion) -> StorageResult<Version>;

    /// Fetches a version by id.
    async fn get(&self, version_id: &VersionId) -> StorageResult<Version>;

    /// The current head version, if any.
    async fn head(&self, content_id: &ContentId) -> StorageResult<Option<Version>>;

    /// Up to `limit` versions, newest first by `created_at`, then by
    /// `sequence`.
    async fn history(&self, content_id: &ContentId, limit: usize) -> StorageResult<Vec<Version>>;

    /// Removes a version. Fails with `HeadProtected` for the current head.
    async fn delete(&self, version_id: &VersionId) -> StorageResult<()>;
}

/// Ordering used by `history`: newest first, ties by higher sequence.
pub(crate) fn newest_first(a: &Version, b: &Version) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.sequence.cmp(&a.sequence))
}
