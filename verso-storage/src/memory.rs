use crate::store::newest_first;
use crate::{StorageError, StorageResult, VersionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use verso_model::{ApprovalState, ContentItem, NewVersion, Version};
use verso_types::{ContentId, VersionId};

struct ItemEntry {
    item: ContentItem,
    next_sequence: u64,
    versions: Vec<VersionId>,
}

#[derive(Default)]
struct Inner {
    items: HashMap<ContentId, ItemEntry>,
    versions: HashMap<VersionId, Version>,
}

impl Inner {
    fn entry(&self, content_id: &ContentId) -> StorageResult<&ItemEntry> {
        self.items
            .get(content_id)
            .ok_or_else(|| StorageError::NotFound(format!("content {content_id}")))
    }

    fn check_parents(&self, version: &NewVersion) -> StorageResult<()> {
        for parent in version.parents() {
            match self.versions.get(parent) {
                Some(p) if p.content_id == version.content_id => {}
                Some(_) => {
                    return Err(StorageError::InvalidData(format!(
                        "parent {parent} belongs to another content item"
                    )));
                }
                None => return Err(StorageError::NotFound(format!("parent version {parent}"))),
            }
        }
        Ok(())
    }

    /// Stores `version` unless an identical id is already present.
    fn insert(&mut self, version: NewVersion) -> StorageResult<Version> {
        if let Some(existing) = self.versions.get(&version.version_id) {
            return Ok(existing.clone());
        }
        let entry = self
            .items
            .get_mut(&version.content_id)
            .ok_or_else(|| StorageError::NotFound(format!("content {}", version.content_id)))?;
        let stored = version.into_version(entry.next_sequence);
        entry.next_sequence += 1;
        entry.versions.push(stored.version_id.clone());
        self.versions
            .insert(stored.version_id.clone(), stored.clone());
        Ok(stored)
    }
}

/// In-memory [`VersionStore`].
///
/// All state sits behind one async RwLock, so every operation, including the
/// head compare-and-set, is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryVersionStore {
    inner: RwLock<Inner>,
}

impl MemoryVersionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn create_item(
        &self,
        content_id: &ContentId,
        content_type: &str,
    ) -> StorageResult<ContentItem> {
        let mut inner = self.inner.write().await;
        if inner.items.contains_key(content_id) {
            return Err(StorageError::AlreadyExists(format!("content {content_id}")));
        }
        let item = ContentItem::new(content_id.clone(), content_type);
        inner.items.insert(
            content_id.clone(),
            ItemEntry {
                item: item.clone(),
                next_sequence: 1,
                versions: Vec::new(),
            },
        );
        Ok(item)
    }

    async fn item(&self, content_id: &ContentId) -> StorageResult<Option<ContentItem>> {
        let inner = self.inner.read().await;
        Ok(inner.items.get(content_id).map(|e| e.item.clone()))
    }

    async fn set_approval_state(
        &self,
        content_id: &ContentId,
        expected: ApprovalState,
        next: ApprovalState,
    ) -> StorageResult<ContentItem> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .items
            .get_mut(content_id)
            .ok_or_else(|| StorageError::NotFound(format!("content {content_id}")))?;
        if entry.item.approval_state != expected {
            return Err(StorageError::StateConflict {
                content_id: content_id.clone(),
                expected,
                actual: entry.item.approval_state,
            });
        }
        entry.item.approval_state = next;
        Ok(entry.item.clone())
    }

    async fn put(
        &self,
        version: NewVersion,
        expected_parent: Option<&VersionId>,
    ) -> StorageResult<Version> {
        let mut inner = self.inner.write().await;
        let item = &inner.entry(&version.content_id)?.item;
        if !item.approval_state.is_editable() {
            return Err(StorageError::Locked {
                content_id: version.content_id.clone(),
                state: item.approval_state,
            });
        }
        let actual = item.head_version_id.clone();
        if actual.as_ref() != expected_parent {
            return Err(StorageError::Conflict {
                content_id: version.content_id.clone(),
                expected: expected_parent.cloned(),
                actual,
            });
        }
        inner.check_parents(&version)?;

        let stored = inner.insert(version)?;
        if let Some(entry) = inner.items.get_mut(&stored.content_id) {
            entry.item.head_version_id = Some(stored.version_id.clone());
        }
        debug!(
            "Moved head of {} to {} (#{})",
            stored.content_id,
            stored.version_id.short(),
            stored.sequence
        );
        Ok(stored)
    }

    async fn insert_branch(&self, version: NewVersion) -> StorageResult<Version> {
        let mut inner = self.inner.write().await;
        inner.entry(&version.content_id)?;
        inner.check_parents(&version)?;
        let stored = inner.insert(version)?;
        debug!(
            "Stored branch version {} of {}",
            stored.version_id.short(),
            stored.content_id
        );
        Ok(stored)
    }

    async fn get(&self, version_id: &VersionId) -> StorageResult<Version> {
        let inner = self.inner.read().await;
        inner
            .versions
            .get(version_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("version {version_id}")))
    }

    async fn head(&self, content_id: &ContentId) -> StorageResult<Option<Version>> {
        let inner = self.inner.read().await;
        let entry = inner.entry(content_id)?;
        Ok(entry
            .item
            .head_version_id
            .as_ref()
            .and_then(|id| inner.versions.get(id))
            .cloned())
    }

    async fn history(&self, content_id: &ContentId, limit: usize) -> StorageResult<Vec<Version>> {
        let inner = self.inner.read().await;
        let entry = inner.entry(content_id)?;
        let mut versions: Vec<Version> = entry
            .versions
            .iter()
            .filter_map(|id| inner.versions.get(id))
            .cloned()
            .collect();
        versions.sort_by(newest_first);
        versions.truncate(limit);
        Ok(versions)
    }

    async fn delete(&self, version_id: &VersionId) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        let content_id = inner
            .versions
            .get(version_id)
            .map(|v| v.content_id.clone())
            .ok_or_else(|| StorageError::NotFound(format!("version {version_id}")))?;

        if let Some(entry) = inner.items.get_mut(&content_id) {
            if entry.item.head_version_id.as_ref() == Some(version_id) {
                return Err(StorageError::HeadProtected(version_id.clone()));
            }
            entry.versions.retain(|id| id != version_id);
        }
        inner.versions.remove(version_id);
        debug!("Deleted version {} of {}", version_id.short(), content_id);
        Ok(())
    }
}
