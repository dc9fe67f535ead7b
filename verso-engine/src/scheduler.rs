//! Decides whether an edit is worth a new snapshot, and whether it may be
//! written at all.

use crate::config::{ChangeMetric, EngineConfig};
use crate::{EngineError, EngineResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;
use verso_model::{identity, NoRisk, Payload, RiskAnalyzer, Version};

/// Outcome of [`AutoVersionScheduler::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotDecision {
    pub change_percent: f64,
    pub snapshot: bool,
}

/// Snapshot heuristic plus the pre-write risk gate.
pub struct AutoVersionScheduler {
    metric: ChangeMetric,
    segment_len: usize,
    snapshot_threshold: f64,
    risk_threshold: f64,
    analyzer: Arc<dyn RiskAnalyzer>,
}

impl AutoVersionScheduler {
    /// Creates a scheduler with the thresholds from `config`.
    pub fn new(config: &EngineConfig, analyzer: Arc<dyn RiskAnalyzer>) -> Self {
        Self {
            metric: config.change_metric,
            segment_len: config.segment_len.max(1),
            snapshot_threshold: config.snapshot_threshold,
            risk_threshold: config.risk_threshold,
            analyzer,
        }
    }

    /// Percentage (0 to 100) by which `payload` differs from `head`. With no
    /// head everything is new.
    #[must_use]
    pub fn change_percent(&self, head: Option<&Version>, payload: &Payload) -> f64 {
        let Some(head) = head else {
            return 100.0;
        };
        match self.metric {
            ChangeMetric::HashSegments => {
                hash_segment_change(&head.content_hash, &identity::content_hash(payload), self.segment_len)
            }
            ChangeMetric::FieldRatio => field_ratio_change(&head.payload, payload),
        }
    }

    #[must_use]
    pub fn should_snapshot(&self, head: Option<&Version>, payload: &Payload) -> bool {
        self.assess(head, payload).snapshot
    }

    /// Scores `payload` and blocks it if the score exceeds the threshold.
    /// A score that is not a number is blocked too.
    pub fn check_risk(&self, payload: &Payload) -> EngineResult<f64> {
        let score = self.analyzer.analyze(payload);
        if score.is_nan() || score > self.risk_threshold {
            warn!("Blocked write with risk score {score:.2}");
            return Err(EngineError::HighRiskContent { score });
        }
        Ok(score)
    }

    /// The snapshot heuristic alone, for callers that already ran
    /// [`check_risk`](Self::check_risk).
    #[must_use]
    pub fn assess(&self, head: Option<&Version>, payload: &Payload) -> SnapshotDecision {
        let change_percent = self.change_percent(head, payload);
        SnapshotDecision {
            change_percent,
            snapshot: head.is_none() || change_percent >= self.snapshot_threshold,
        }
    }

    /// Risk gate first, then the snapshot heuristic.
    pub fn evaluate(&self, head: Option<&Version>, payload: &Payload) -> EngineResult<SnapshotDecision> {
        self.check_risk(payload)?;
        Ok(self.assess(head, payload))
    }
}

impl Default for AutoVersionScheduler {
    fn default() -> Self {
        Self::new(&EngineConfig::default(), Arc::new(NoRisk))
    }
}

/// Positional comparison of `segment_len`-char chunks of two digests.
#[must_use]
pub fn hash_segment_change(old: &str, new: &str, segment_len: usize) -> f64 {
    let segment_len = segment_len.max(1);
    let old: Vec<&[u8]> = old.as_bytes().chunks(segment_len).collect();
    let new: Vec<&[u8]> = new.as_bytes().chunks(segment_len).collect();
    let total = old.len().max(new.len());
    if total == 0 {
        return 0.0;
    }
    let matching = old.iter().zip(&new).filter(|(a, b)| a == b).count();
    100.0 * (1.0 - matching as f64 / total as f64)
}

/// Share of top-level fields whose value differs.
#[must_use]
pub fn field_ratio_change(old: &Payload, new: &Payload) -> f64 {
    let fields: BTreeSet<&str> = old.fields().chain(new.fields()).collect();
    if fields.is_empty() {
        return 0.0;
    }
    let changed = fields
        .iter()
        .filter(|f| old.get(f) != new.get(f))
        .count();
    100.0 * changed as f64 / fields.len() as f64
}
