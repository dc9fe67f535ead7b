//! Retention policy for version history.

use crate::{EngineError, EngineResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use verso_storage::VersionStore;
use verso_types::{ContentId, VersionId};

/// Removes versions beyond a keep-count, never the head.
pub struct RevisionPruner {
    store: Arc<dyn VersionStore>,
}

impl RevisionPruner {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }

    /// Keeps the `keep` newest versions of `content_id` plus the head, and
    /// deletes the rest. If the head is not among the newest it takes the
    /// place of the oldest kept one. Returns how many versions were removed.
    pub async fn prune(&self, content_id: &ContentId, keep: usize) -> EngineResult<usize> {
        let item = self
            .store
            .item(content_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("content {content_id}")))?;
        let history = self.store.history(content_id, usize::MAX).await?;

        let mut kept: Vec<&VersionId> = history.iter().take(keep).map(|v| &v.version_id).collect();
        if let Some(head) = item.head_version_id.as_ref() {
            if !kept.contains(&head) {
                if kept.len() == keep && !kept.is_empty() {
                    kept.pop();
                }
                kept.push(head);
            }
        }
        let kept: HashSet<&VersionId> = kept.into_iter().collect();

        let mut removed = 0;
        for version in &history {
            if kept.contains(&version.version_id) {
                continue;
            }
            self.store.delete(&version.version_id).await?;
            debug!(
                "Pruned version {} (#{}) of {}",
                version.version_id.short(),
                version.sequence,
                content_id
            );
            removed += 1;
        }
        if removed > 0 {
            info!("Pruned {removed} versions of {content_id}, kept {}", kept.len());
        }
        Ok(removed)
    }
}
