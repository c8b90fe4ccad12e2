//! Vector clock: the causal-ordering primitive for multi-client sync.
//!
//! Each client owns one clock for the lifetime of its session. Local events
//! call [`VectorClock::increment`] before emission (FIFO per node); inbound
//! remote clocks are folded in with [`VectorClock::merge`]. Two clocks that
//! diverge in both directions are *concurrent*: the deltas they stamp were
//! produced without knowledge of each other, and no total order exists.
//!
//! Counters serialize as decimal strings, never JSON numbers, so values past
//! the 53-bit float-safe range survive a round-trip through any JSON stack.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

use std::collections::BTreeMap;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};

/// Per-node causal counters. Missing nodes implicitly read as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClockRepr", into = "ClockRepr")]
pub struct VectorClock {
    node_id: String,
    counters: BTreeMap<String, u64>,
}

/// Serialized form: counters as decimal strings.
#[derive(Serialize, Deserialize)]
struct ClockRepr {
    node_id: String,
    counters: BTreeMap<String, String>,
}

impl From<VectorClock> for ClockRepr {
    fn from(clock: VectorClock) -> Self {
        Self {
            node_id: clock.node_id,
            counters: clock
                .counters
                .into_iter()
                .map(|(node, time)| (node, time.to_string()))
                .collect(),
        }
    }
}

impl TryFrom<ClockRepr> for VectorClock {
    type Error = ParseIntError;

    fn try_from(repr: ClockRepr) -> Result<Self, Self::Error> {
        let mut counters = BTreeMap::new();
        for (node, time) in repr.counters {
            counters.insert(node, time.parse::<u64>()?);
        }
        Ok(Self { node_id: repr.node_id, counters })
    }
}

impl VectorClock {
    /// Create a fresh clock for the given node with all counters at 0.
    #[must_use]
    pub fn new(node_id: impl Into<String>) -> Self {
        Self { node_id: node_id.into(), counters: BTreeMap::new() }
    }

    /// Rebuild a clock from decimal-string counters (the wire form).
    /// Returns `None` if any counter is not a valid decimal `u64`.
    #[must_use]
    pub fn from_counters(
        node_id: impl Into<String>,
        counters: &BTreeMap<String, String>,
    ) -> Option<Self> {
        let mut parsed = BTreeMap::new();
        for (node, time) in counters {
            let Ok(time) = time.parse::<u64>() else {
                return None;
            };
            parsed.insert(node.clone(), time);
        }
        Some(Self { node_id: node_id.into(), counters: parsed })
    }

    /// The node this clock counts local events for.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Bump the local node's counter by one. Called before every local emission.
    pub fn increment(&mut self) {
        let counter = self.counters.entry(self.node_id.clone()).or_insert(0);
        *counter = counter.saturating_add(1);
    }

    /// Fold another clock in: pointwise max over every node present in either.
    /// Commutative, idempotent, associative.
    pub fn merge(&mut self, other: &VectorClock) {
        for (node, &time) in &other.counters {
            let counter = self.counters.entry(node.clone()).or_insert(0);
            *counter = (*counter).max(time);
        }
    }

    /// Counter for an arbitrary node; unknown nodes read as 0.
    #[must_use]
    pub fn time(&self, node: &str) -> u64 {
        self.counters.get(node).copied().unwrap_or(0)
    }

    /// Counter for the local node.
    #[must_use]
    pub fn local_time(&self) -> u64 {
        self.time(&self.node_id)
    }

    /// True iff this clock's history strictly precedes `other`'s:
    /// ≤ on every node, < on at least one. Irreflexive.
    #[must_use]
    pub fn happens_before(&self, other: &VectorClock) -> bool {
        let mut strictly_less = false;
        for node in self.counters.keys().chain(other.counters.keys()) {
            let ours = self.time(node);
            let theirs = other.time(node);
            if ours > theirs {
                return false;
            }
            if ours < theirs {
                strictly_less = true;
            }
        }
        strictly_less
    }

    /// True iff neither clock happens-before the other: the two event
    /// histories diverged without knowledge of each other.
    #[must_use]
    pub fn is_concurrent(&self, other: &VectorClock) -> bool {
        !self.happens_before(other) && !other.happens_before(self)
    }

    /// Counters as decimal strings, the form carried on the wire.
    #[must_use]
    pub fn to_string_counters(&self) -> BTreeMap<String, String> {
        self.counters
            .iter()
            .map(|(node, time)| (node.clone(), time.to_string()))
            .collect()
    }
}
