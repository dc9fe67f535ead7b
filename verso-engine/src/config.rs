//! Engine configuration.

use crate::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use verso_model::{MergeRules, MergeStrategyRule};

/// How the scheduler measures the size of a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMetric {
    /// Positional comparison of fixed-size content hash segments.
    #[default]
    HashSegments,
    /// Share of top-level fields whose value changed.
    FieldRatio,
}

/// Configuration for the versioning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compare-and-set retries after the first attempt.
    pub max_retries: u32,
    /// Similarity (0-100) a diff must exceed to merge automatically.
    pub similarity_threshold: f64,
    /// Change percentage at which autosave takes a snapshot.
    pub snapshot_threshold: f64,
    /// Hex chars per hash segment for [`ChangeMetric::HashSegments`].
    pub segment_len: usize,
    pub change_metric: ChangeMetric,
    /// Risk score (0-1) above which writes are blocked.
    pub risk_threshold: f64,
    /// Versions kept by `prune` when no count is given.
    pub default_keep: usize,
    /// Merge rules keyed by content type.
    pub rules: HashMap<String, MergeStrategyRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            similarity_threshold: 70.0,
            snapshot_threshold: 5.0,
            segment_len: 8,
            change_metric: ChangeMetric::HashSegments,
            risk_threshold: 0.7,
            default_keep: 50,
            rules: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Validation(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Validation(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Checks every value is in range.
    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(EngineError::Validation(format!(
                "similarity_threshold must be within 0..=100, got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.snapshot_threshold) {
            return Err(EngineError::Validation(format!(
                "snapshot_threshold must be within 0..=100, got {}",
                self.snapshot_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.risk_threshold) {
            return Err(EngineError::Validation(format!(
                "risk_threshold must be within 0..=1, got {}",
                self.risk_threshold
            )));
        }
        if self.segment_len == 0 {
            return Err(EngineError::Validation("segment_len must be positive".into()));
        }
        Ok(())
    }

    /// Total compare-and-set attempts per commit.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// The configured rules as a registry-ready set.
    #[must_use]
    pub fn merge_rules(&self) -> MergeRules {
        MergeRules::from(self.rules.clone())
    }
}
