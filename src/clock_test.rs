use super::*;

fn clock_with(node_id: &str, entries: &[(&str, u64)]) -> VectorClock {
    let counters: BTreeMap<String, String> = entries
        .iter()
        .map(|(node, time)| ((*node).to_string(), time.to_string()))
        .collect();
    VectorClock::from_counters(node_id, &counters).unwrap()
}

// =============================================================
// Increment / merge
// =============================================================

#[test]
fn new_clock_reads_zero_everywhere() {
    let clock = VectorClock::new("a");
    assert_eq!(clock.local_time(), 0);
    assert_eq!(clock.time("b"), 0);
}

#[test]
fn increment_bumps_only_local_counter() {
    let mut clock = VectorClock::new("a");
    clock.increment();
    clock.increment();
    assert_eq!(clock.local_time(), 2);
    assert_eq!(clock.time("b"), 0);
}

#[test]
fn merge_takes_pointwise_max() {
    let mut a = clock_with("a", &[("a", 3), ("b", 1)]);
    let b = clock_with("b", &[("a", 2), ("b", 5), ("c", 1)]);
    a.merge(&b);
    assert_eq!(a.time("a"), 3);
    assert_eq!(a.time("b"), 5);
    assert_eq!(a.time("c"), 1);
}

#[test]
fn merge_is_commutative() {
    let base_a = clock_with("a", &[("a", 3), ("b", 1)]);
    let base_b = clock_with("b", &[("a", 2), ("b", 5)]);

    let mut ab = base_a.clone();
    ab.merge(&base_b);
    let mut ba = base_b.clone();
    ba.merge(&base_a);

    for node in ["a", "b"] {
        assert_eq!(ab.time(node), ba.time(node));
    }
}

#[test]
fn merge_is_idempotent() {
    let mut a = clock_with("a", &[("a", 3), ("b", 1)]);
    let b = clock_with("b", &[("a", 2), ("b", 5)]);
    a.merge(&b);
    let once = a.clone();
    a.merge(&b);
    assert_eq!(a, once);
}

#[test]
fn merge_never_decreases_counters() {
    let mut a = clock_with("a", &[("a", 10)]);
    let b = clock_with("b", &[("a", 1)]);
    a.merge(&b);
    assert_eq!(a.time("a"), 10);
}

// =============================================================
// Ordering
// =============================================================

#[test]
fn happens_before_is_irreflexive() {
    let clock = clock_with("a", &[("a", 2), ("b", 3)]);
    assert!(!clock.happens_before(&clock));
}

#[test]
fn happens_before_strict_dominance() {
    let earlier = clock_with("a", &[("a", 1)]);
    let later = clock_with("a", &[("a", 2), ("b", 1)]);
    assert!(earlier.happens_before(&later));
    assert!(!later.happens_before(&earlier));
}

#[test]
fn happens_before_treats_missing_nodes_as_zero() {
    let earlier = VectorClock::new("a");
    let later = clock_with("b", &[("b", 1)]);
    assert!(earlier.happens_before(&later));
}

#[test]
fn equal_clocks_are_unordered_hence_concurrent() {
    let a = clock_with("a", &[("a", 2), ("b", 2)]);
    let b = clock_with("b", &[("a", 2), ("b", 2)]);
    assert!(!a.happens_before(&b));
    assert!(!b.happens_before(&a));
    assert!(a.is_concurrent(&b));
}

#[test]
fn divergent_clocks_are_concurrent() {
    let a = clock_with("a", &[("a", 2), ("b", 1)]);
    let b = clock_with("b", &[("a", 1), ("b", 2)]);
    assert!(a.is_concurrent(&b));
    assert!(b.is_concurrent(&a));
}

#[test]
fn ordered_clocks_are_not_concurrent() {
    let earlier = clock_with("a", &[("a", 1), ("b", 1)]);
    let later = clock_with("b", &[("a", 1), ("b", 2)]);
    assert!(!earlier.is_concurrent(&later));
}

// =============================================================
// Serde: decimal-string counters
// =============================================================

#[test]
fn counters_serialize_as_strings() {
    let clock = clock_with("a", &[("a", 42)]);
    let json = serde_json::to_value(&clock).unwrap();
    assert_eq!(json["counters"]["a"], "42");
}

#[test]
fn counter_beyond_float_safe_range_survives_roundtrip() {
    // 2^53 + 1 is not representable as an f64.
    let big = (1_u64 << 53) + 1;
    let clock = clock_with("a", &[("a", big)]);
    let json = serde_json::to_string(&clock).unwrap();
    let back: VectorClock = serde_json::from_str(&json).unwrap();
    assert_eq!(back.time("a"), big);
}

#[test]
fn u64_max_counter_survives_roundtrip() {
    let clock = clock_with("a", &[("a", u64::MAX)]);
    let json = serde_json::to_string(&clock).unwrap();
    let back: VectorClock = serde_json::from_str(&json).unwrap();
    assert_eq!(back.time("a"), u64::MAX);
}

#[test]
fn malformed_counter_string_rejects() {
    let json = r#"{"node_id":"a","counters":{"a":"not-a-number"}}"#;
    let result = serde_json::from_str::<VectorClock>(json);
    assert!(result.is_err());
}

#[test]
fn negative_counter_string_rejects() {
    let json = r#"{"node_id":"a","counters":{"a":"-1"}}"#;
    let result = serde_json::from_str::<VectorClock>(json);
    assert!(result.is_err());
}

#[test]
fn from_counters_rejects_malformed_entry() {
    let mut counters = BTreeMap::new();
    counters.insert("a".to_string(), "12x".to_string());
    assert!(VectorClock::from_counters("a", &counters).is_none());
}

#[test]
fn to_string_counters_roundtrips_through_from_counters() {
    let mut clock = VectorClock::new("a");
    clock.increment();
    clock.increment();
    let wire = clock.to_string_counters();
    let back = VectorClock::from_counters("a", &wire).unwrap();
    assert_eq!(back, clock);
}

#[test]
fn increment_saturates_at_max() {
    let mut clock = clock_with("a", &[("a", u64::MAX)]);
    clock.increment();
    assert_eq!(clock.local_time(), u64::MAX);
}
