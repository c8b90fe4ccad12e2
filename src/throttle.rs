//! Reusable trailing-edge throttle.
//!
//! The policy is throttle-and-drop: the first call after the window elapses
//! passes through, calls inside the window are dropped outright (never
//! queued or coalesced). Time is injected by the caller so the primitive is
//! deterministic and independent of any scheduler.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod throttle_test;

/// Drop-style throttle keyed on the timestamp of the last passed call.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    window_ms: u64,
    last_pass_ms: Option<u64>,
}

impl Throttle {
    /// Create a throttle with the given window.
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self { window_ms, last_pass_ms: None }
    }

    /// Whether a call at `now_ms` passes. The very first call always passes;
    /// after that, a call passes only once the window has elapsed since the
    /// last passed call.
    pub fn allow(&mut self, now_ms: u64) -> bool {
        match self.last_pass_ms {
            Some(last) if now_ms.saturating_sub(last) < self.window_ms => false,
            _ => {
                self.last_pass_ms = Some(now_ms);
                true
            }
        }
    }

    /// Forget the last pass so the next call goes through immediately.
    pub fn reset(&mut self) {
        self.last_pass_ms = None;
    }
}
