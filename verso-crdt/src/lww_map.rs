//! Per-key last-writer-wins state.
//!
//! [`LwwMap`] holds one [`LWWRegister`] per key and is how scalar content
//! state (flags, counters set by editors, layout toggles) is reconciled across
//! replicas. Keys are never removed; clearing a value is a write of `null`.

use crate::LWWRegister;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use verso_types::{Clock, HybridTimestamp, ReplicaId};

/// A map of last-writer-wins registers keyed by field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LwwMap {
    /// The replica that performs local writes on this copy.
    replica: ReplicaId,
    registers: BTreeMap<String, LWWRegister<Value>>,
}

impl LwwMap {
    /// Creates an empty map owned by `replica`.
    #[must_use]
    pub fn new(replica: ReplicaId) -> Self {
        Self {
            replica,
            registers: BTreeMap::new(),
        }
    }

    /// Returns the replica that writes to this copy.
    #[must_use]
    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    /// Assigns `value` to `key`, stamped by `clock`.
    pub fn update(&mut self, key: impl Into<String>, value: Value, clock: &dyn Clock) {
        let key = key.into();
        match self.registers.get_mut(&key) {
            Some(register) => register.set(value, clock, self.replica),
            None => {
                self.registers
                    .insert(key, LWWRegister::new(value, clock, self.replica));
            }
        }
    }

    /// Applies a remote write with an explicit stamp. Returns true if it won.
    pub fn apply_remote(
        &mut self,
        key: impl Into<String>,
        value: Value,
        timestamp: HybridTimestamp,
        replica: ReplicaId,
    ) -> bool {
        let key = key.into();
        match self.registers.get_mut(&key) {
            Some(register) => register.set_with_timestamp(value, timestamp, replica),
            None => {
                self.registers
                    .insert(key, LWWRegister::with_timestamp(value, timestamp, replica));
                true
            }
        }
    }

    /// Returns the current value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.registers.get(key).map(LWWRegister::value)
    }

    /// Returns the register for `key`, including its stamp.
    #[must_use]
    pub fn register(&self, key: &str) -> Option<&LWWRegister<Value>> {
        self.registers.get(key)
    }

    /// Number of keys ever written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Returns true if no key was ever written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Iterates over keys and current values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.registers.iter().map(|(k, r)| (k.as_str(), r.value()))
    }

    /// Snapshot of the current values as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Map<String, Value> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Merges a remote copy into this one, key by key.
    ///
    /// A remote register is adopted only if its stamp is strictly greater;
    /// on an exact tie the local register stays.
    pub fn merge(&mut self, remote: &Self) {
        for (key, theirs) in &remote.registers {
            match self.registers.get_mut(key) {
                Some(ours) => ours.merge(theirs),
                None => {
                    self.registers.insert(key.clone(), theirs.clone());
                }
            }
        }
    }

    /// Returns the merge of `self` (local) and `remote` without mutating either.
    #[must_use]
    pub fn merged(&self, remote: &Self) -> Self {
        let mut result = self.clone();
        result.merge(remote);
        result
    }
}

/// Two maps are equal when they hold the same registers; the owning replica
/// is a property of the copy, not of the state.
impl PartialEq for LwwMap {
    fn eq(&self, other: &Self) -> bool {
        self.registers == other.registers
    }
}

impl Eq for LwwMap {}
