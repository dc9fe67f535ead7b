//! The versioning engine: commit, conflict resolution, workflow and
//! retention over an injected [`VersionStore`].

use crate::config::EngineConfig;
use crate::detector::{ConflictDetector, ConflictReport};
use crate::lineage;
use crate::pruner::RevisionPruner;
use crate::registry::{MergeOutcome, MergeStrategyRegistry};
use crate::scheduler::AutoVersionScheduler;
use crate::{EngineError, EngineResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use verso_model::{
    identity, ApprovalState, ContentItem, Lineage, MergeResolution, MergeRules, NewVersion,
    NoRisk, Payload, RiskAnalyzer, Version, VersionKind,
};
use verso_storage::{StorageError, VersionStore};
use verso_types::{Clock, ContentId, SystemClock, VersionId};

/// What a commit did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A new version became the head.
    Created(Version),
    /// The payload equals the head; nothing was written.
    Unchanged(VersionId),
    /// The head moved concurrently. The edit was kept as a branch and merged
    /// automatically; `version` is the merge, now the head.
    Merged {
        version: Version,
        report: ConflictReport,
    },
    /// The head moved concurrently and the merge needs a person. Both
    /// versions are stored; the head did not move.
    NeedsResolution {
        head: Version,
        incoming: Version,
        report: ConflictReport,
    },
    /// Autosave only: the change is below the snapshot threshold.
    Deferred {
        head: VersionId,
        change_percent: f64,
    },
}

impl CommitOutcome {
    /// The head after the commit, when the commit moved or matched it.
    #[must_use]
    pub fn head_id(&self) -> Option<&VersionId> {
        match self {
            Self::Created(v) | Self::Merged { version: v, .. } => Some(&v.version_id),
            Self::Unchanged(id) | Self::Deferred { head: id, .. } => Some(id),
            Self::NeedsResolution { head, .. } => Some(&head.version_id),
        }
    }

    /// The version written by this commit, if it became the head.
    #[must_use]
    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Created(v) | Self::Merged { version: v, .. } => Some(v),
            _ => None,
        }
    }
}

/// A merge computed but not committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergePreview {
    pub ancestor: Option<VersionId>,
    pub report: ConflictReport,
    pub merge: MergeOutcome,
}

/// Content versioning and conflict resolution over a shared store.
///
/// Cheap to share: wrap in an `Arc` and call from any number of tasks. The
/// only shared mutable state is the store's per-content head pointer and
/// approval state, both updated by compare-and-set.
pub struct VersioningEngine {
    store: Arc<dyn VersionStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    detector: ConflictDetector,
    registry: MergeStrategyRegistry,
    scheduler: AutoVersionScheduler,
    pruner: RevisionPruner,
}

impl VersioningEngine {
    /// Creates an engine with the system clock, no risk analysis and the
    /// merge rules from `config`.
    pub fn new(store: Arc<dyn VersionStore>, config: EngineConfig) -> Self {
        let rules = config.merge_rules();
        Self::with_collaborators(store, Arc::new(SystemClock::new()), Arc::new(NoRisk), rules, config)
    }

    /// Creates an engine with every collaborator supplied by the caller.
    pub fn with_collaborators(
        store: Arc<dyn VersionStore>,
        clock: Arc<dyn Clock>,
        risk: Arc<dyn RiskAnalyzer>,
        rules: MergeRules,
        config: EngineConfig,
    ) -> Self {
        Self {
            detector: ConflictDetector::new(config.similarity_threshold),
            registry: MergeStrategyRegistry::new(rules),
            scheduler: AutoVersionScheduler::new(&config, risk),
            pruner: RevisionPruner::new(Arc::clone(&store)),
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    pub fn registry(&self) -> &MergeStrategyRegistry {
        &self.registry
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub fn scheduler(&self) -> &AutoVersionScheduler {
        &self.scheduler
    }

    // ── Content items ────────────────────────────────────────────

    /// Registers a content item of `content_type`. It starts in draft.
    pub async fn register_content(
        &self,
        content_id: &ContentId,
        content_type: &str,
    ) -> EngineResult<ContentItem> {
        if content_id.as_str().trim().is_empty() {
            return Err(EngineError::Validation("content id must not be empty".into()));
        }
        let item = self
            .store
            .create_item(content_id, content_type)
            .await
            .map_err(|e| match e {
                StorageError::AlreadyExists(what) => {
                    EngineError::Validation(format!("{what} already exists"))
                }
                other => other.into(),
            })?;
        info!("Registered {content_id} ({content_type})");
        Ok(item)
    }

    pub async fn content(&self, content_id: &ContentId) -> EngineResult<ContentItem> {
        self.store
            .item(content_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("content {content_id}")))
    }

    /// Moves the approval state to `next` if the workflow allows it.
    pub async fn transition_state(
        &self,
        content_id: &ContentId,
        next: ApprovalState,
    ) -> EngineResult<ContentItem> {
        let max_attempts = self.config.max_attempts();
        for attempt in 1..=max_attempts {
            let current = self.content(content_id).await?.approval_state;
            current.transition(next)?;
            match self.store.set_approval_state(content_id, current, next).await {
                Ok(item) => {
                    info!("{content_id}: {current} -> {next}");
                    return Ok(item);
                }
                Err(StorageError::StateConflict { actual, .. }) => {
                    debug!("{content_id}: state changed to {actual} concurrently (attempt {attempt})");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::PersistentConflict {
            attempts: max_attempts,
        })
    }

    // ── Commits ──────────────────────────────────────────────────

    /// Commits `payload` on top of the current head.
    pub async fn create_version(
        &self,
        content_id: &ContentId,
        payload: Payload,
        author: &str,
    ) -> EngineResult<CommitOutcome> {
        let base = self.store.head(content_id).await?.map(|v| v.version_id);
        self.commit(content_id, base, payload, author, VersionKind::Edit)
            .await
    }

    /// Commits `payload` as an edit of `base`, the version the author
    /// started from. If the head has moved since, the edit is kept as a
    /// branch and merged.
    pub async fn commit_edit(
        &self,
        content_id: &ContentId,
        base: Option<&VersionId>,
        payload: Payload,
        author: &str,
    ) -> EngineResult<CommitOutcome> {
        if let Some(base) = base {
            self.version_of(content_id, base).await?;
        }
        self.commit(content_id, base.cloned(), payload, author, VersionKind::Edit)
            .await
    }

    /// Commits `payload` as an autosave if it differs enough from the head.
    pub async fn autosave(
        &self,
        content_id: &ContentId,
        payload: Payload,
        author: &str,
    ) -> EngineResult<CommitOutcome> {
        validate_author(author)?;
        let head = self.store.head(content_id).await?;
        if let Some(head) = &head {
            if identity::is_no_op(Some(head), &payload) {
                return Ok(CommitOutcome::Unchanged(head.version_id.clone()));
            }
        }
        self.scheduler.check_risk(&payload)?;
        let decision = self.scheduler.assess(head.as_ref(), &payload);
        if let (false, Some(head)) = (decision.snapshot, &head) {
            debug!(
                "Autosave of {content_id} deferred: {:.1}% change",
                decision.change_percent
            );
            return Ok(CommitOutcome::Deferred {
                head: head.version_id.clone(),
                change_percent: decision.change_percent,
            });
        }
        let base = head.map(|v| v.version_id);
        self.commit_screened(content_id, base, payload, author, VersionKind::Autosave)
            .await
    }

    /// Makes a copy of an earlier version's payload the new head.
    pub async fn restore_version(
        &self,
        content_id: &ContentId,
        version_id: &VersionId,
        author: &str,
    ) -> EngineResult<CommitOutcome> {
        let source = self.version_of(content_id, version_id).await?;
        let base = self.store.head(content_id).await?.map(|v| v.version_id);
        let kind = VersionKind::Restore {
            source: source.version_id.clone(),
        };
        self.commit(content_id, base, source.payload, author, kind)
            .await
    }

    async fn commit(
        &self,
        content_id: &ContentId,
        base: Option<VersionId>,
        payload: Payload,
        author: &str,
        kind: VersionKind,
    ) -> EngineResult<CommitOutcome> {
        validate_author(author)?;
        self.scheduler.check_risk(&payload)?;
        self.commit_screened(content_id, base, payload, author, kind)
            .await
    }

    /// The commit loop, for a payload whose author and risk are already
    /// checked.
    async fn commit_screened(
        &self,
        content_id: &ContentId,
        base: Option<VersionId>,
        payload: Payload,
        author: &str,
        kind: VersionKind,
    ) -> EngineResult<CommitOutcome> {
        let max_attempts = self.config.max_attempts();
        let mut branch: Option<Version> = None;

        for attempt in 1..=max_attempts {
            let item = self.editable_item(content_id).await?;
            let head = self.store.head(content_id).await?;
            let head_id = head.as_ref().map(|v| v.version_id.clone());

            if let Some(head) = &head {
                if identity::is_no_op(Some(head), &payload) {
                    debug!("{content_id}: payload equals head {}", head.version_id.short());
                    return Ok(CommitOutcome::Unchanged(head.version_id.clone()));
                }
            }

            let Some(head) = head.filter(|_| head_id != base) else {
                let draft = NewVersion::new(
                    content_id.clone(),
                    Lineage::on_top_of(base.as_ref()),
                    payload.clone(),
                    author,
                    self.clock.now(),
                    kind.clone(),
                );
                match self.store.put(draft, base.as_ref()).await {
                    Ok(version) => {
                        info!(
                            "{content_id}: created {} (#{}) by {author}",
                            version.version_id.short(),
                            version.sequence
                        );
                        return Ok(CommitOutcome::Created(version));
                    }
                    Err(StorageError::Conflict { actual, .. }) => {
                        debug!(
                            "{content_id}: head moved to {:?} (attempt {attempt})",
                            actual.as_ref().map(VersionId::short)
                        );
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            // The head moved past the author's base: keep the edit as a
            // branch, then try to merge it into the head.
            let incoming = match branch.take() {
                Some(b) => b,
                None => {
                    self.store_branch(content_id, base.as_ref(), &payload, author, &kind)
                        .await?
                }
            };
            let rule = self.registry.rule_for(&item.content_type);
            let report = self.detector.detect(&head, &incoming, rule);
            if !report.automatic_merge_possible {
                warn!(
                    "{content_id}: edit by {author} conflicts with head {} ({:.1}% similar)",
                    head.version_id.short(),
                    report.similarity_score
                );
                return Ok(CommitOutcome::NeedsResolution {
                    head,
                    incoming,
                    report,
                });
            }

            let ancestor =
                lineage::common_ancestor(self.store.as_ref(), &head.version_id, &incoming.version_id)
                    .await?;
            let merge = self.registry.auto_merge(
                &item.content_type,
                ancestor.as_ref(),
                &head,
                &incoming,
            );
            if identity::is_no_op(Some(&head), &merge.payload) {
                debug!(
                    "{content_id}: edit by {author} adds nothing to head {}",
                    head.version_id.short()
                );
                return Ok(CommitOutcome::Unchanged(head.version_id));
            }
            self.scheduler.check_risk(&merge.payload)?;

            let draft = self.merge_draft(
                content_id,
                &head,
                &incoming,
                merge.payload,
                MergeResolution::Automatic {
                    strategies: merge.strategies,
                },
                author,
            );
            match self.store.put(draft, Some(&head.version_id)).await {
                Ok(version) => {
                    info!(
                        "{content_id}: merged {} into {} as {}",
                        incoming.version_id.short(),
                        head.version_id.short(),
                        version.version_id.short()
                    );
                    return Ok(CommitOutcome::Merged { version, report });
                }
                Err(StorageError::Conflict { .. }) => {
                    debug!("{content_id}: head moved during merge (attempt {attempt})");
                    branch = Some(incoming);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Out of attempts. Make sure the edit itself survives.
        if branch.is_none() {
            self.store_branch(content_id, base.as_ref(), &payload, author, &kind)
                .await?;
        }
        warn!("{content_id}: giving up after {max_attempts} attempts");
        Err(EngineError::PersistentConflict {
            attempts: max_attempts,
        })
    }

    async fn store_branch(
        &self,
        content_id: &ContentId,
        base: Option<&VersionId>,
        payload: &Payload,
        author: &str,
        kind: &VersionKind,
    ) -> EngineResult<Version> {
        let draft = NewVersion::new(
            content_id.clone(),
            Lineage::on_top_of(base),
            payload.clone(),
            author,
            self.clock.now(),
            kind.clone(),
        );
        Ok(self.store.insert_branch(draft).await?)
    }

    fn merge_draft(
        &self,
        content_id: &ContentId,
        head: &Version,
        incoming: &Version,
        payload: Payload,
        resolution: MergeResolution,
        author: &str,
    ) -> NewVersion {
        NewVersion::new(
            content_id.clone(),
            Lineage::Merge {
                parents: [head.version_id.clone(), incoming.version_id.clone()],
                resolution,
            },
            payload,
            author,
            self.clock.now(),
            VersionKind::Merge,
        )
    }

    async fn editable_item(&self, content_id: &ContentId) -> EngineResult<ContentItem> {
        let item = self.content(content_id).await?;
        if !item.approval_state.is_editable() {
            return Err(EngineError::NotEditable {
                content_id: content_id.clone(),
                state: item.approval_state,
            });
        }
        Ok(item)
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Up to `limit` versions, newest first.
    pub async fn get_history(
        &self,
        content_id: &ContentId,
        limit: usize,
    ) -> EngineResult<Vec<Version>> {
        Ok(self.store.history(content_id, limit).await?)
    }

    pub async fn get_version(&self, version_id: &VersionId) -> EngineResult<Version> {
        Ok(self.store.get(version_id).await?)
    }

    /// Fetches a version and checks it belongs to `content_id`.
    async fn version_of(
        &self,
        content_id: &ContentId,
        version_id: &VersionId,
    ) -> EngineResult<Version> {
        let version = self.store.get(version_id).await?;
        if &version.content_id != content_id {
            return Err(EngineError::Validation(format!(
                "version {} belongs to {}, not {content_id}",
                version_id.short(),
                version.content_id
            )));
        }
        Ok(version)
    }

    /// Loads two versions of the same content and their common ancestor.
    async fn related(
        &self,
        content_id: &ContentId,
        a: &VersionId,
        b: &VersionId,
    ) -> EngineResult<(ContentItem, Version, Version, Version)> {
        let item = self.content(content_id).await?;
        let va = self.version_of(content_id, a).await?;
        let vb = self.version_of(content_id, b).await?;
        let ancestor = lineage::common_ancestor(self.store.as_ref(), a, b)
            .await?
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "versions {} and {} share no common ancestor",
                    a.short(),
                    b.short()
                ))
            })?;
        Ok((item, va, vb, ancestor))
    }

    /// Field-level diff of two versions that share an ancestor.
    pub async fn compare_versions(
        &self,
        content_id: &ContentId,
        a: &VersionId,
        b: &VersionId,
    ) -> EngineResult<ConflictReport> {
        let (item, va, vb, _) = self.related(content_id, a, b).await?;
        Ok(self
            .detector
            .detect(&va, &vb, self.registry.rule_for(&item.content_type)))
    }

    /// Computes the merge of `b` into `a` without committing it.
    pub async fn preview_merge(
        &self,
        content_id: &ContentId,
        a: &VersionId,
        b: &VersionId,
    ) -> EngineResult<MergePreview> {
        let (item, va, vb, ancestor) = self.related(content_id, a, b).await?;
        let report = self
            .detector
            .detect(&va, &vb, self.registry.rule_for(&item.content_type));
        let merge = self
            .registry
            .auto_merge(&item.content_type, Some(&ancestor), &va, &vb);
        Ok(MergePreview {
            ancestor: Some(ancestor.version_id),
            report,
            merge,
        })
    }

    /// Merges two diverged versions automatically and commits the result as
    /// the new head. One of them must be the current head.
    ///
    /// Fails with `ManualResolutionRequired` when the diff is not safe to
    /// merge without a person.
    pub async fn resolve_conflict(
        &self,
        content_id: &ContentId,
        a: &VersionId,
        b: &VersionId,
        author: &str,
    ) -> EngineResult<Version> {
        validate_author(author)?;
        let (item, va, vb, ancestor) = self.related(content_id, a, b).await?;
        let (head, other) = self.orient(content_id, va, vb).await?;

        let rule = self.registry.rule_for(&item.content_type);
        let report = self.detector.detect(&head, &other, rule);
        if !report.automatic_merge_possible {
            return Err(EngineError::ManualResolutionRequired {
                report: Box::new(report),
            });
        }
        let merge = self
            .registry
            .auto_merge(&item.content_type, Some(&ancestor), &head, &other);
        let resolution = MergeResolution::Automatic {
            strategies: merge.strategies,
        };
        self.commit_merge(content_id, &head, &other, merge.payload, resolution, author)
            .await
    }

    /// Commits a payload a person produced from two diverged versions, with
    /// both recorded as parents. One of them must be the current head.
    pub async fn commit_manual_merge(
        &self,
        content_id: &ContentId,
        a: &VersionId,
        b: &VersionId,
        payload: Payload,
        author: &str,
    ) -> EngineResult<Version> {
        validate_author(author)?;
        let va = self.version_of(content_id, a).await?;
        let vb = self.version_of(content_id, b).await?;
        let (head, other) = self.orient(content_id, va, vb).await?;
        self.commit_merge(content_id, &head, &other, payload, MergeResolution::Manual, author)
            .await
    }

    /// Orders two versions as `(current head, other)`.
    async fn orient(
        &self,
        content_id: &ContentId,
        a: Version,
        b: Version,
    ) -> EngineResult<(Version, Version)> {
        let head_id = self.store.head(content_id).await?.map(|v| v.version_id);
        if head_id.as_ref() == Some(&a.version_id) {
            return Ok((a, b));
        }
        if head_id.as_ref() == Some(&b.version_id) {
            return Ok((b, a));
        }
        Err(EngineError::VersionConflict {
            content_id: content_id.clone(),
            expected: Some(a.version_id),
            actual: head_id,
        })
    }

    async fn commit_merge(
        &self,
        content_id: &ContentId,
        head: &Version,
        other: &Version,
        payload: Payload,
        resolution: MergeResolution,
        author: &str,
    ) -> EngineResult<Version> {
        self.editable_item(content_id).await?;
        self.scheduler.check_risk(&payload)?;
        let draft = self.merge_draft(content_id, head, other, payload, resolution, author);
        let version = self.store.put(draft, Some(&head.version_id)).await?;
        info!(
            "{content_id}: resolved {} and {} as {}",
            head.version_id.short(),
            other.version_id.short(),
            version.version_id.short()
        );
        Ok(version)
    }

    // ── Retention ────────────────────────────────────────────────

    /// Prunes history down to `keep` versions (config default when `None`).
    pub async fn prune(&self, content_id: &ContentId, keep: Option<usize>) -> EngineResult<usize> {
        self.pruner
            .prune(content_id, keep.unwrap_or(self.config.default_keep))
            .await
    }
}

fn validate_author(author: &str) -> EngineResult<()> {
    if author.trim().is_empty() {
        return Err(EngineError::Validation("author must not be empty".into()));
    }
    Ok(())
}
