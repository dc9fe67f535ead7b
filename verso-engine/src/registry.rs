//! Per-content-type merge rules and the field merge itself.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};
use verso_crdt::{text_ot, LWWRegister};
use verso_model::{FieldStrategy, MergeRules, MergeStrategyRule, Payload, Version};
use verso_types::{ReplicaId, VersionId};

/// A merged payload, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub payload: Payload,
    /// Strategy applied to each field both sides changed. A strategy that did
    /// not fit the values is recorded as the overwrite it fell back to.
    pub strategies: BTreeMap<String, FieldStrategy>,
}

/// Holds merge rules and produces merged payloads.
#[derive(Debug, Clone, Default)]
pub struct MergeStrategyRegistry {
    rules: MergeRules,
}

impl MergeStrategyRegistry {
    #[must_use]
    pub fn new(rules: MergeRules) -> Self {
        Self { rules }
    }

    /// Registers (or replaces) the rule for a content type.
    pub fn register(&mut self, content_type: impl Into<String>, rule: MergeStrategyRule) {
        self.rules.register(content_type, rule);
    }

    #[must_use]
    pub fn rule_for(&self, content_type: &str) -> &MergeStrategyRule {
        self.rules.rule_for(content_type)
    }

    #[must_use]
    pub fn rules(&self) -> &MergeRules {
        &self.rules
    }

    /// Merges `incoming` into `base` under the rule for `content_type`.
    ///
    /// With a common `ancestor`, a field changed on one side only takes that
    /// side's value and only fields changed on both sides go through their
    /// strategy. Without one, every differing field does.
    #[must_use]
    pub fn auto_merge(
        &self,
        content_type: &str,
        ancestor: Option<&Version>,
        base: &Version,
        incoming: &Version,
    ) -> MergeOutcome {
        merge_versions(self.rule_for(content_type), ancestor, base, incoming)
    }
}

/// Rule-driven three-way merge. See [`MergeStrategyRegistry::auto_merge`].
#[must_use]
pub fn merge_versions(
    rule: &MergeStrategyRule,
    ancestor: Option<&Version>,
    base: &Version,
    incoming: &Version,
) -> MergeOutcome {
    let fields: BTreeSet<&str> = base
        .payload
        .fields()
        .chain(incoming.payload.fields())
        .chain(ancestor.into_iter().flat_map(|a| a.payload.fields()))
        .collect();

    let mut payload = base.payload.clone();
    let mut strategies = BTreeMap::new();

    for field in fields {
        let ours = base.payload.get(field);
        let theirs = incoming.payload.get(field);
        if ours == theirs {
            continue;
        }

        let original = ancestor.map(|a| a.payload.get(field));
        match original {
            Some(original) if original == ours => {
                set_field(&mut payload, field, theirs.cloned());
                continue;
            }
            Some(original) if original == theirs => continue,
            _ => {}
        }

        let sides = Sides {
            field,
            original: original.flatten(),
            has_ancestor: ancestor.is_some(),
            base,
            incoming,
        };
        let (value, applied) = sides.apply(rule.strategy_for(field));
        debug!("Merged field {field} with {applied}");
        set_field(&mut payload, field, value);
        strategies.insert(field.to_string(), applied);
    }

    MergeOutcome {
        payload,
        strategies,
    }
}

fn set_field(payload: &mut Payload, field: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            payload.insert(field, value);
        }
        None => {
            payload.remove(field);
        }
    }
}

/// Both sides of one conflicting field.
struct Sides<'a> {
    field: &'a str,
    original: Option<&'a Value>,
    has_ancestor: bool,
    base: &'a Version,
    incoming: &'a Version,
}

impl Sides<'_> {
    fn ours(&self) -> Option<&Value> {
        self.base.payload.get(self.field)
    }

    fn theirs(&self) -> Option<&Value> {
        self.incoming.payload.get(self.field)
    }

    fn overwrite(&self) -> (Option<Value>, FieldStrategy) {
        (self.theirs().cloned(), FieldStrategy::Overwrite)
    }

    fn fallback(&self, strategy: FieldStrategy) -> (Option<Value>, FieldStrategy) {
        warn!(
            "Strategy {strategy} does not fit field {}; overwriting",
            self.field
        );
        self.overwrite()
    }

    /// `(older, newer)` by creation time, then version id.
    fn by_age(&self) -> (&Version, &Version) {
        let key = |v: &Version| (v.created_at, v.version_id.clone());
        if key(self.base) <= key(self.incoming) {
            (self.base, self.incoming)
        } else {
            (self.incoming, self.base)
        }
    }

    fn apply(&self, strategy: FieldStrategy) -> (Option<Value>, FieldStrategy) {
        match strategy {
            FieldStrategy::Overwrite => self.overwrite(),
            FieldStrategy::Concat => self.concat(),
            FieldStrategy::Union => self.union(),
            FieldStrategy::SmartMerge => self.smart_merge(),
            FieldStrategy::TextTransform => self.text_transform(),
            FieldStrategy::LastWriterWins => self.last_writer_wins(),
        }
    }

    fn concat(&self) -> (Option<Value>, FieldStrategy) {
        let (older, newer) = self.by_age();
        match (older.payload.get(self.field), newer.payload.get(self.field)) {
            (Some(Value::String(a)), Some(Value::String(b))) => (
                Some(Value::String(format!("{a}\n{b}"))),
                FieldStrategy::Concat,
            ),
            _ => self.fallback(FieldStrategy::Concat),
        }
    }

    fn union(&self) -> (Option<Value>, FieldStrategy) {
        match (self.ours(), self.theirs()) {
            (Some(Value::Array(ours)), Some(Value::Array(theirs))) => {
                let mut merged: Vec<Value> = Vec::with_capacity(ours.len() + theirs.len());
                for item in ours.iter().chain(theirs) {
                    if !merged.contains(item) {
                        merged.push(item.clone());
                    }
                }
                (Some(Value::Array(merged)), FieldStrategy::Union)
            }
            _ => self.fallback(FieldStrategy::Union),
        }
    }

    fn smart_merge(&self) -> (Option<Value>, FieldStrategy) {
        match (self.ours(), self.theirs()) {
            (Some(Value::Object(ours)), Some(Value::Object(theirs))) => (
                Some(Value::Object(deep_merge(ours, theirs))),
                FieldStrategy::SmartMerge,
            ),
            _ => self.fallback(FieldStrategy::SmartMerge),
        }
    }

    fn text_transform(&self) -> (Option<Value>, FieldStrategy) {
        if !self.has_ancestor {
            return self.fallback(FieldStrategy::TextTransform);
        }
        let original = match self.original {
            None => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return self.fallback(FieldStrategy::TextTransform),
        };
        match (self.ours(), self.theirs()) {
            (Some(Value::String(ours)), Some(Value::String(theirs))) => {
                match text_ot::merge_text(
                    original,
                    ours,
                    theirs,
                    self.base.version_id.as_str(),
                    self.incoming.version_id.as_str(),
                ) {
                    Ok(text) => (Some(Value::String(text)), FieldStrategy::TextTransform),
                    Err(e) => {
                        warn!("Text merge of field {} failed: {e}", self.field);
                        self.overwrite()
                    }
                }
            }
            _ => self.fallback(FieldStrategy::TextTransform),
        }
    }

    fn last_writer_wins(&self) -> (Option<Value>, FieldStrategy) {
        let mut register = LWWRegister::with_timestamp(
            self.ours().cloned(),
            self.base.created_at,
            writer_of(&self.base.version_id),
        );
        let theirs = LWWRegister::with_timestamp(
            self.theirs().cloned(),
            self.incoming.created_at,
            writer_of(&self.incoming.version_id),
        );
        register.merge(&theirs);
        (register.into_value(), FieldStrategy::LastWriterWins)
    }
}

/// Stable replica identity for a version, ordered like its id.
fn writer_of(version_id: &VersionId) -> ReplicaId {
    let prefix = version_id.as_str().get(..32).unwrap_or_default();
    let bits = u128::from_str_radix(prefix, 16).unwrap_or_default();
    ReplicaId::from_uuid(uuid::Uuid::from_u128(bits))
}

/// Recursive object merge: shared keys recurse when both are objects and
/// otherwise take `theirs`; keys on one side only are kept.
fn deep_merge(ours: &Map<String, Value>, theirs: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = ours.clone();
    for (key, their_value) in theirs {
        let value = match (ours.get(key), their_value) {
            (Some(Value::Object(a)), Value::Object(b)) => Value::Object(deep_merge(a, b)),
            _ => their_value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged
}
