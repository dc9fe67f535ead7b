//! Field-level diff between two versions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use verso_model::{MergeStrategyRule, Payload, Version};

/// How a field differs between the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Absent on the first side.
    Added,
    /// Absent on the second side.
    Removed,
    Modified,
}

/// One differing field. `None` means the field is absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub kind: ChangeKind,
}

/// Counts of changed fields per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

/// Result of comparing two versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub fields_changed: BTreeMap<String, FieldChange>,
    /// Percentage of compared fields that are equal, 0 to 100.
    pub similarity_score: f64,
    /// Changed fields the rule marks critical.
    pub critical_conflicts: BTreeSet<String>,
    /// Advisory: whether a merge may be applied without a person.
    pub automatic_merge_possible: bool,
    pub stats: DiffStats,
}

impl ConflictReport {
    /// True when the two sides are field-for-field equal.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.fields_changed.is_empty()
    }
}

/// Computes [`ConflictReport`]s.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    similarity_threshold: f64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(70.0)
    }
}

impl ConflictDetector {
    #[must_use]
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    #[must_use]
    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Compares two versions' payloads.
    #[must_use]
    pub fn detect(&self, a: &Version, b: &Version, rule: &MergeStrategyRule) -> ConflictReport {
        self.detect_payloads(&a.payload, &b.payload, rule)
    }

    /// Compares two payloads over the rule's known fields, or over every
    /// field either payload has when the rule declares none.
    #[must_use]
    pub fn detect_payloads(
        &self,
        a: &Payload,
        b: &Payload,
        rule: &MergeStrategyRule,
    ) -> ConflictReport {
        let fields: BTreeSet<&str> = if rule.fields.is_empty() {
            a.fields().chain(b.fields()).collect()
        } else {
            rule.fields.iter().map(String::as_str).collect()
        };

        let mut fields_changed = BTreeMap::new();
        let mut stats = DiffStats::default();
        for &field in &fields {
            let (old, new) = (a.get(field), b.get(field));
            if old == new {
                continue;
            }
            let kind = match (old, new) {
                (None, _) => ChangeKind::Added,
                (_, None) => ChangeKind::Removed,
                _ => ChangeKind::Modified,
            };
            match kind {
                ChangeKind::Added => stats.added += 1,
                ChangeKind::Removed => stats.removed += 1,
                ChangeKind::Modified => stats.modified += 1,
            }
            fields_changed.insert(
                field.to_string(),
                FieldChange {
                    old: old.cloned(),
                    new: new.cloned(),
                    kind,
                },
            );
        }

        let total = fields.len();
        let similarity_score = if total == 0 {
            100.0
        } else {
            100.0 * (total - fields_changed.len()) as f64 / total as f64
        };
        let critical_conflicts: BTreeSet<String> = fields_changed
            .keys()
            .filter(|f| rule.is_critical(f))
            .cloned()
            .collect();
        let automatic_merge_possible =
            critical_conflicts.is_empty() && similarity_score > self.similarity_threshold;

        ConflictReport {
            fields_changed,
            similarity_score,
            critical_conflicts,
            automatic_merge_possible,
            stats,
        }
    }
}

/// Fields where `current` and `incoming` both moved away from `base` and
/// disagree with each other.
#[must_use]
pub fn three_way_conflicts(base: &Payload, current: &Payload, incoming: &Payload) -> BTreeSet<String> {
    base.fields()
        .chain(current.fields())
        .chain(incoming.fields())
        .filter(|f| {
            let (b, c, i) = (base.get(f), current.get(f), incoming.get(f));
            c != b && i != b && c != i
        })
        .map(str::to_string)
        .collect()
}
