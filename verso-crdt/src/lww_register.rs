//! Last-Writer-Wins Register (LWW-Register).
//!
//! A CRDT that stores a single value. Concurrent writes are resolved by
//! comparing stamps; the write with the highest stamp wins.
//!
//! Use cases:
//! - Scalar content state (publish flags, sort weights, SEO toggles)
//! - Payload fields configured with the last-writer-wins merge strategy

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use verso_types::{Clock, HybridTimestamp, ReplicaId};

/// A Last-Writer-Wins Register.
///
/// Stores a value of type `T` along with the stamp of the write that produced
/// it. A stamp is the pair `(timestamp, replica)`, compared lexicographically,
/// so two distinct writes never tie. An exactly equal stamp can only be the
/// same write seen twice, in which case the local copy is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LWWRegister<T> {
    /// The current value.
    value: T,
    /// Timestamp of the last write.
    timestamp: HybridTimestamp,
    /// Replica that performed the last write.
    replica: ReplicaId,
}

impl<T> LWWRegister<T> {
    /// Creates a register whose first write is stamped by `clock`.
    #[must_use]
    pub fn new(value: T, clock: &dyn Clock, replica: ReplicaId) -> Self {
        Self {
            value,
            timestamp: clock.now(),
            replica,
        }
    }

    /// Creates a register with explicit timestamp (for testing or replay).
    #[must_use]
    pub fn with_timestamp(value: T, timestamp: HybridTimestamp, replica: ReplicaId) -> Self {
        Self {
            value,
            timestamp,
            replica,
        }
    }

    /// Returns a reference to the current value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the register, returning its value.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns the timestamp of the last write.
    #[must_use]
    pub fn timestamp(&self) -> HybridTimestamp {
        self.timestamp
    }

    /// Returns the replica that performed the last write.
    #[must_use]
    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    /// Sets a new value stamped by `clock`.
    ///
    /// The new stamp is forced past the current one so a local write always
    /// supersedes what the register holds, even if the clock lags behind a
    /// previously merged remote write.
    pub fn set(&mut self, value: T, clock: &dyn Clock, replica: ReplicaId) {
        let reading = clock.now();
        self.timestamp = if reading > self.timestamp {
            reading
        } else {
            self.timestamp.tick_at(reading.wall_time())
        };
        self.value = value;
        self.replica = replica;
    }

    /// Sets a new value with an explicit timestamp.
    ///
    /// Only updates if the incoming stamp is greater than the current one.
    /// Returns true if the value was updated.
    pub fn set_with_timestamp(
        &mut self,
        value: T,
        timestamp: HybridTimestamp,
        replica: ReplicaId,
    ) -> bool {
        if self.should_update(timestamp, replica) {
            self.value = value;
            self.timestamp = timestamp;
            self.replica = replica;
            true
        } else {
            false
        }
    }

    /// Determines if an incoming write should win over the current value.
    fn should_update(&self, timestamp: HybridTimestamp, replica: ReplicaId) -> bool {
        match timestamp.cmp(&self.timestamp) {
            Ordering::Greater => true,
            Ordering::Less => false,
            // Same instant on two replicas: replica id decides. Same replica
            // too means the same write, keep ours.
            Ordering::Equal => replica > self.replica,
        }
    }
}

impl<T: Clone> LWWRegister<T> {
    /// Merges another register into this one.
    ///
    /// The value with the higher stamp wins. This operation is:
    /// - Commutative: merge(a, b) == merge(b, a)
    /// - Associative: merge(merge(a, b), c) == merge(a, merge(b, c))
    /// - Idempotent: merge(a, a) == a
    pub fn merge(&mut self, other: &Self) {
        if self.should_update(other.timestamp, other.replica) {
            self.value = other.value.clone();
            self.timestamp = other.timestamp;
            self.replica = other.replica;
        }
    }

    /// Creates a new register that is the merge of this and another.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }
}

impl<T: PartialEq> PartialEq for LWWRegister<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.timestamp == other.timestamp
            && self.replica == other.replica
    }
}

impl<T: Eq> Eq for LWWRegister<T> {}
