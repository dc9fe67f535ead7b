//! Ancestry queries over the version DAG.

use crate::EngineResult;
use std::collections::{HashMap, VecDeque};
use verso_model::Version;
use verso_storage::{StorageError, VersionStore};
use verso_types::VersionId;

/// Every version reachable from `start` through parent links, `start`
/// included. Parents removed by pruning are skipped.
pub async fn ancestors(
    store: &dyn VersionStore,
    start: &VersionId,
) -> EngineResult<HashMap<VersionId, Version>> {
    let mut seen = HashMap::new();
    let mut queue = VecDeque::from([start.clone()]);
    while let Some(id) = queue.pop_front() {
        if seen.contains_key(&id) {
            continue;
        }
        let version = match store.get(&id).await {
            Ok(v) => v,
            Err(StorageError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };
        queue.extend(version.parents().iter().cloned());
        seen.insert(id, version);
    }
    Ok(seen)
}

/// The most recent version both `a` and `b` descend from, if any.
///
/// Either input counts as its own ancestor, so when one descends from the
/// other the older one is returned.
pub async fn common_ancestor(
    store: &dyn VersionStore,
    a: &VersionId,
    b: &VersionId,
) -> EngineResult<Option<Version>> {
    let of_a = ancestors(store, a).await?;
    let of_b = ancestors(store, b).await?;
    Ok(of_a
        .into_values()
        .filter(|v| of_b.contains_key(&v.version_id))
        .max_by(|x, y| {
            x.created_at
                .cmp(&y.created_at)
                .then_with(|| x.sequence.cmp(&y.sequence))
        }))
}

/// True if `descendant` is `ancestor` or reaches it through parent links.
pub async fn is_ancestor(
    store: &dyn VersionStore,
    ancestor: &VersionId,
    descendant: &VersionId,
) -> EngineResult<bool> {
    Ok(ancestors(store, descendant).await?.contains_key(ancestor))
}
