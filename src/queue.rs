//! Bounded offline operation queue.
//!
//! Operations generated while the transport is down buffer here and replay
//! in FIFO order on reconnect: later board operations may depend on earlier
//! ones (an item cannot be moved on a peer's replica before it was created
//! there). At capacity the queue refuses new operations and counts them —
//! silently evicting *earlier* edits would be worse than refusing new ones,
//! since everything already queued is known-consistent.

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::QUEUE_CAPACITY;

/// One buffered outbound operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Namespaced operation name, e.g. `"stroke.add"`.
    pub op_type: String,
    /// Target item id, when the operation addresses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    /// Operation payload as carried on the wire.
    pub payload: Value,
}

/// Overflow read surface for the UI warning banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowStatus {
    pub has_overflow: bool,
    pub count: u64,
}

/// FIFO buffer with a hard capacity and an overflow counter.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    ops: VecDeque<PendingOperation>,
    overflow_count: u64,
}

impl OfflineQueue {
    /// Create an empty queue at the standard capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation. Returns `false` — and counts the rejection —
    /// when the queue is at capacity. Older entries are never evicted.
    pub fn queue_operation(&mut self, op: PendingOperation) -> bool {
        if self.ops.len() >= QUEUE_CAPACITY {
            self.overflow_count += 1;
            tracing::warn!(
                op_type = %op.op_type,
                overflow_count = self.overflow_count,
                "offline queue full, operation dropped"
            );
            return false;
        }
        self.ops.push_back(op);
        true
    }

    /// Whether any operation has been refused, and how many.
    #[must_use]
    pub fn overflow_status(&self) -> OverflowStatus {
        OverflowStatus {
            has_overflow: self.overflow_count > 0,
            count: self.overflow_count,
        }
    }

    /// Number of buffered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drain all buffered operations in FIFO order for replay. The caller
    /// may stop consuming mid-flush (session teardown); undrained items are
    /// discarded with the iterator.
    pub fn drain(&mut self) -> impl Iterator<Item = PendingOperation> + '_ {
        self.ops.drain(..)
    }

    /// Drop everything buffered without replaying.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Reset the overflow counter after the UI has surfaced the loss.
    pub fn clear_overflow(&mut self) {
        self.overflow_count = 0;
    }
}
