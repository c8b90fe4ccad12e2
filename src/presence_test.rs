use super::*;

use crate::consts::LASER_SWEEP_INTERVAL_MS;

fn channel() -> LaserChannel {
    LaserChannel::new("alice", "Alice", "#ff0000", "page-1")
}

fn peer_update(user_id: &str, x: f64, active: bool) -> LaserUpdate {
    LaserUpdate {
        user_id: user_id.to_string(),
        display_name: user_id.to_string(),
        x,
        y: 0.0,
        page_id: "page-1".to_string(),
        color: "#00ff00".to_string(),
        active,
    }
}

// =============================================================
// Local laser
// =============================================================

#[test]
fn start_broadcasts_immediately() {
    let mut laser = channel();
    let update = laser.start(10.0, 20.0, 0);
    assert!(laser.is_active());
    assert!(update.active);
    assert_eq!(update.user_id, "alice");
    assert_eq!(update.page_id, "page-1");
    assert!((update.x - 10.0).abs() < f64::EPSILON);
}

#[test]
fn moves_inside_window_are_dropped() {
    let mut laser = channel();
    laser.start(0.0, 0.0, 0);
    assert!(laser.move_to(1.0, 1.0, 5).is_none());
    assert!(laser.move_to(2.0, 2.0, 10).is_none());
    let late = laser.move_to(3.0, 3.0, 40);
    assert!(late.is_some());
}

#[test]
fn burst_produces_exactly_two_broadcasts() {
    let mut laser = channel();
    let mut sent = vec![Some(laser.start(0.0, 0.0, 0))];
    for t in [5_u64, 10, 40] {
        sent.push(laser.move_to(t as f64, 0.0, t));
    }
    assert_eq!(sent.iter().filter(|u| u.is_some()).count(), 2);
}

#[test]
fn move_while_inactive_is_ignored() {
    let mut laser = channel();
    assert!(laser.move_to(1.0, 1.0, 100).is_none());
}

#[test]
fn stop_broadcasts_deactivation_once() {
    let mut laser = channel();
    laser.start(0.0, 0.0, 0);
    let stop = laser.stop().unwrap();
    assert!(!stop.active);
    assert!(!laser.is_active());
    assert!(laser.stop().is_none());
}

#[test]
fn restart_after_stop_broadcasts_immediately() {
    let mut laser = channel();
    laser.start(0.0, 0.0, 0);
    laser.stop();
    // Even right after a throttled period, start is never dropped.
    let update = laser.start(5.0, 5.0, 1);
    assert!(update.active);
}

#[test]
fn set_page_applies_to_subsequent_broadcasts() {
    let mut laser = channel();
    laser.set_page("page-2");
    let update = laser.start(0.0, 0.0, 0);
    assert_eq!(update.page_id, "page-2");
}

// =============================================================
// Remote lasers
// =============================================================

#[test]
fn remote_update_is_tracked() {
    let mut laser = channel();
    assert!(laser.apply_remote(&peer_update("bob", 5.0, true), 100));
    let remote = laser.remote_lasers().get("bob").unwrap();
    assert!((remote.x - 5.0).abs() < f64::EPSILON);
    assert_eq!(remote.last_update_ms, 100);
}

#[test]
fn own_echo_is_ignored() {
    let mut laser = channel();
    assert!(!laser.apply_remote(&peer_update("alice", 5.0, true), 100));
    assert!(laser.remote_lasers().is_empty());
}

#[test]
fn deactivation_removes_remote_laser() {
    let mut laser = channel();
    laser.apply_remote(&peer_update("bob", 5.0, true), 100);
    assert!(laser.apply_remote(&peer_update("bob", 0.0, false), 200));
    assert!(laser.remote_lasers().is_empty());
    // Deactivating an unknown peer changes nothing.
    assert!(!laser.apply_remote(&peer_update("carol", 0.0, false), 200));
}

#[test]
fn newer_update_replaces_position_and_timestamp() {
    let mut laser = channel();
    laser.apply_remote(&peer_update("bob", 5.0, true), 100);
    laser.apply_remote(&peer_update("bob", 9.0, true), 150);
    let remote = laser.remote_lasers().get("bob").unwrap();
    assert!((remote.x - 9.0).abs() < f64::EPSILON);
    assert_eq!(remote.last_update_ms, 150);
}

// =============================================================
// Stale sweep
// =============================================================

#[test]
fn sweep_evicts_only_stale_lasers() {
    let mut laser = channel();
    laser.apply_remote(&peer_update("bob", 1.0, true), 0);
    laser.apply_remote(&peer_update("carol", 2.0, true), 2500);

    // At t=4000 bob is 4s old (stale), carol 1.5s (fresh).
    assert_eq!(laser.sweep(4000), 1);
    assert!(laser.remote_lasers().contains_key("carol"));
    assert!(!laser.remote_lasers().contains_key("bob"));
}

#[test]
fn sweep_at_exact_threshold_keeps_the_laser() {
    let mut laser = channel();
    laser.apply_remote(&peer_update("bob", 1.0, true), 0);
    assert_eq!(laser.sweep(LASER_STALE_MS), 0);
    assert_eq!(laser.sweep(LASER_STALE_MS + 1), 1);
}

#[test]
fn periodic_sweeps_converge_to_empty() {
    let mut laser = channel();
    laser.apply_remote(&peer_update("bob", 1.0, true), 0);
    let mut now = 0;
    let mut evicted = 0;
    // Simulate the host's sweep interval with no further updates arriving.
    for _ in 0..5 {
        now += LASER_SWEEP_INTERVAL_MS;
        evicted += laser.sweep(now);
    }
    assert_eq!(evicted, 1);
    assert!(laser.remote_lasers().is_empty());
}
