//! Clock collaborators.
//!
//! Version `created_at` values and CRDT register stamps come from a [`Clock`]
//! handed to the engine, never from a global. [`SystemClock`] wraps the hybrid
//! logical clock around wall time; [`ManualClock`] is fully deterministic and
//! intended for tests and replay.

use crate::timestamp::{wall_clock_millis, HybridTimestamp};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of monotonically increasing timestamps.
pub trait Clock: Send + Sync {
    /// Returns a timestamp strictly greater than every previous reading.
    fn now(&self) -> HybridTimestamp;
}

/// Hybrid logical clock over the system wall clock.
///
/// Readings never go backwards even if the wall clock does.
#[derive(Debug)]
pub struct SystemClock {
    last: Mutex<HybridTimestamp>,
}

impl SystemClock {
    /// Creates a clock starting at the current wall time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: Mutex::new(HybridTimestamp::zero()),
        }
    }

    /// Advances this clock past a timestamp observed from another replica.
    pub fn observe(&self, remote: HybridTimestamp) {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = last.receive(&remote);
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> HybridTimestamp {
        // A poisoned lock still holds a valid timestamp.
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = last.tick_at(wall_clock_millis());
        *last = next;
        next
    }
}

/// Deterministic clock: each reading advances the wall component by a fixed step.
#[derive(Debug)]
pub struct ManualClock {
    next_wall: AtomicU64,
    step: u64,
}

impl ManualClock {
    /// Creates a clock whose first reading is `start`, advancing by 1 ms.
    #[must_use]
    pub fn starting_at(start: u64) -> Self {
        Self::with_step(start, 1)
    }

    /// Creates a clock whose readings advance by `step` milliseconds.
    #[must_use]
    pub fn with_step(start: u64, step: u64) -> Self {
        Self {
            next_wall: AtomicU64::new(start),
            step: step.max(1),
        }
    }

    /// Jumps the clock forward so the next reading is at least `wall`.
    pub fn advance_to(&self, wall: u64) {
        self.next_wall.fetch_max(wall, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HybridTimestamp {
        let wall = self.next_wall.fetch_add(self.step, Ordering::SeqCst);
        HybridTimestamp::new(wall, 0)
    }
}
