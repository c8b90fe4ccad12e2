//! Ephemeral laser-pointer presence.
//!
//! Laser positions are pure presence: never recorded in history, never
//! persisted, never queued offline. Local moves pass through a drop-style
//! throttle before broadcast; remote lasers live in a map keyed by user and
//! are evicted by a periodic stale sweep, so a peer that vanishes without a
//! deactivation message still disappears within a few seconds.
//!
//! All time enters as caller-supplied milliseconds. The channel never reads
//! a clock or schedules anything; the host drives the sweep on its own timer.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts::{LASER_STALE_MS, LASER_THROTTLE_MS};
use crate::throttle::Throttle;

/// One laser broadcast, local or remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserUpdate {
    pub user_id: String,
    pub display_name: String,
    pub x: f64,
    pub y: f64,
    /// Page the laser is pointing at; peers on other pages don't render it.
    pub page_id: String,
    pub color: String,
    /// `false` announces deactivation; peers drop the laser immediately.
    pub active: bool,
}

/// A peer's laser as currently known, with its arrival timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteLaser {
    pub display_name: String,
    pub x: f64,
    pub y: f64,
    pub page_id: String,
    pub color: String,
    pub last_update_ms: u64,
}

/// Laser state for one session: the local pointer plus every live peer.
#[derive(Debug)]
pub struct LaserChannel {
    user_id: String,
    display_name: String,
    color: String,
    page_id: String,
    active: bool,
    throttle: Throttle,
    remote: HashMap<String, RemoteLaser>,
}

impl LaserChannel {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        color: impl Into<String>,
        page_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            color: color.into(),
            page_id: page_id.into(),
            active: false,
            throttle: Throttle::new(LASER_THROTTLE_MS),
            remote: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Follow the session onto another page. Subsequent broadcasts carry the
    /// new page id.
    pub fn set_page(&mut self, page_id: impl Into<String>) {
        self.page_id = page_id.into();
    }

    /// Activate the local laser. The initial position always broadcasts
    /// immediately; the throttle starts counting from it.
    pub fn start(&mut self, x: f64, y: f64, now_ms: u64) -> LaserUpdate {
        self.active = true;
        self.throttle.reset();
        // Consume the first pass so the next move is throttled against now.
        self.throttle.allow(now_ms);
        self.update(x, y, true)
    }

    /// Move the active laser. Returns a broadcast only when the throttle
    /// window has elapsed; in-window moves are dropped, not queued, since
    /// only the latest position matters. `None` while inactive.
    pub fn move_to(&mut self, x: f64, y: f64, now_ms: u64) -> Option<LaserUpdate> {
        if !self.active || !self.throttle.allow(now_ms) {
            return None;
        }
        Some(self.update(x, y, true))
    }

    /// Deactivate the local laser, producing the deactivation broadcast.
    /// A no-op (`None`) when the laser is already off.
    pub fn stop(&mut self) -> Option<LaserUpdate> {
        if !self.active {
            return None;
        }
        self.active = false;
        Some(self.update(0.0, 0.0, false))
    }

    fn update(&self, x: f64, y: f64, active: bool) -> LaserUpdate {
        LaserUpdate {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            x,
            y,
            page_id: self.page_id.clone(),
            color: self.color.clone(),
            active,
        }
    }

    /// Fold in a peer's broadcast. Our own echo is ignored; `active: false`
    /// removes the peer's laser. Returns `true` if the remote set changed.
    pub fn apply_remote(&mut self, update: &LaserUpdate, now_ms: u64) -> bool {
        if update.user_id == self.user_id {
            return false;
        }
        if !update.active {
            return self.remote.remove(&update.user_id).is_some();
        }
        self.remote.insert(
            update.user_id.clone(),
            RemoteLaser {
                display_name: update.display_name.clone(),
                x: update.x,
                y: update.y,
                page_id: update.page_id.clone(),
                color: update.color.clone(),
                last_update_ms: now_ms,
            },
        );
        true
    }

    /// Evict remote lasers that have gone quiet. The host calls this on its
    /// sweep interval; anything older than the stale threshold is dropped.
    /// Returns the number of lasers evicted.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let before = self.remote.len();
        self.remote
            .retain(|_, laser| now_ms.saturating_sub(laser.last_update_ms) <= LASER_STALE_MS);
        let evicted = before - self.remote.len();
        if evicted > 0 {
            tracing::debug!(evicted, "stale remote lasers evicted");
        }
        evicted
    }

    /// Currently known peer lasers, keyed by user id.
    #[must_use]
    pub fn remote_lasers(&self) -> &HashMap<String, RemoteLaser> {
        &self.remote
    }
}
