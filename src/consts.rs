//! Shared numeric constants for the sync core.

// ── Document limits ─────────────────────────────────────────────

/// Hard cap on pages per document.
pub const MAX_PAGES: usize = 200;

/// Maximum entries kept on the undo stack; oldest are evicted first.
pub const MAX_HISTORY: usize = 100;

/// Maximum characters stored for sticky-note text.
pub const MAX_STICKY_TEXT: usize = 500;

/// World-space offset applied to duplicated items.
pub const DUPLICATE_OFFSET: f64 = 20.0;

// ── Offline queue ───────────────────────────────────────────────

/// Fixed capacity of the offline operation queue.
pub const QUEUE_CAPACITY: usize = 1000;

// ── Laser presence ──────────────────────────────────────────────

/// Throttle window for laser move broadcasts (~30 updates/s).
pub const LASER_THROTTLE_MS: u64 = 33;

/// How often the host should call the stale-laser sweep.
pub const LASER_SWEEP_INTERVAL_MS: u64 = 1000;

/// Remote lasers older than this are evicted by the sweep.
pub const LASER_STALE_MS: u64 = 3000;
