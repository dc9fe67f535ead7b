use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// How a single field is resolved when two versions both changed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStrategy {
    /// Take the incoming value.
    #[default]
    Overwrite,
    /// Join two strings, older first, separated by a newline.
    Concat,
    /// Deduplicated union of two lists, base order first.
    Union,
    /// Recursive merge of nested objects, leaves prefer incoming.
    SmartMerge,
    /// Three-way character-level text merge.
    TextTransform,
    /// The value written last wins.
    LastWriterWins,
}

impl FieldStrategy {
    pub const ALL: [Self; 6] = [
        Self::Overwrite,
        Self::Concat,
        Self::Union,
        Self::SmartMerge,
        Self::TextTransform,
        Self::LastWriterWins,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Concat => "concat",
            Self::Union => "union",
            Self::SmartMerge => "smart_merge",
            Self::TextTransform => "text_transform",
            Self::LastWriterWins => "last_writer_wins",
        }
    }
}

impl fmt::Display for FieldStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldStrategy {
    type Err = ModelError;

    /// Accepts snake_case, kebab-case or camelCase names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().replace('_', "") == normalized)
            .ok_or_else(|| ModelError::UnknownStrategy(s.to_string()))
    }
}

/// Merge configuration for one content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeStrategyRule {
    /// Known fields of the content type. When empty, the fields compared are
    /// whatever the two payloads contain.
    pub fields: Vec<String>,
    /// Fields whose divergence always needs a human.
    pub critical_fields: BTreeSet<String>,
    /// Per-field strategies. Unlisted fields use [`FieldStrategy::Overwrite`].
    pub field_strategies: BTreeMap<String, FieldStrategy>,
}

impl MergeStrategyRule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the known fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Marks a field as critical.
    #[must_use]
    pub fn with_critical(mut self, field: impl Into<String>) -> Self {
        self.critical_fields.insert(field.into());
        self
    }

    /// Assigns a strategy to a field.
    #[must_use]
    pub fn with_strategy(mut self, field: impl Into<String>, strategy: FieldStrategy) -> Self {
        self.field_strategies.insert(field.into(), strategy);
        self
    }

    /// Like [`with_strategy`](Self::with_strategy) but parses a strategy name.
    pub fn with_strategy_name(self, field: impl Into<String>, name: &str) -> ModelResult<Self> {
        Ok(self.with_strategy(field, name.parse()?))
    }

    #[must_use]
    pub fn strategy_for(&self, field: &str) -> FieldStrategy {
        self.field_strategies.get(field).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_critical(&self, field: &str) -> bool {
        self.critical_fields.contains(field)
    }
}

/// Merge rules keyed by content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRules {
    rules: HashMap<String, MergeStrategyRule>,
    fallback: MergeStrategyRule,
}

impl MergeRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the rule for `content_type`.
    pub fn register(&mut self, content_type: impl Into<String>, rule: MergeStrategyRule) {
        self.rules.insert(content_type.into(), rule);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_rule(mut self, content_type: impl Into<String>, rule: MergeStrategyRule) -> Self {
        self.register(content_type, rule);
        self
    }

    #[must_use]
    pub fn get(&self, content_type: &str) -> Option<&MergeStrategyRule> {
        self.rules.get(content_type)
    }

    /// The rule for `content_type`, or an empty rule (all fields overwrite,
    /// nothing critical) if none is registered.
    #[must_use]
    pub fn rule_for(&self, content_type: &str) -> &MergeStrategyRule {
        self.rules.get(content_type).unwrap_or(&self.fallback)
    }

    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<HashMap<String, MergeStrategyRule>> for MergeRules {
    fn from(rules: HashMap<String, MergeStrategyRule>) -> Self {
        Self {
            rules,
            fallback: MergeStrategyRule::default(),
        }
    }
}
