use super::*;

use crate::doc::{StrokePoint, StrokeTool};

fn stroke(id: &str) -> Stroke {
    Stroke {
        id: id.to_string(),
        points: vec![StrokePoint { x: 0.0, y: 0.0 }],
        color: "#000000".to_string(),
        size: 2.0,
        tool: StrokeTool::Pen,
        locked: false,
        locked_by: None,
    }
}

fn entry(id: &str) -> HistoryEntry {
    HistoryEntry::AddStroke { page_index: 0, stroke: stroke(id) }
}

// =============================================================
// Stack mechanics
// =============================================================

#[test]
fn new_history_has_nothing_to_undo_or_redo() {
    let history = History::new();
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn record_enables_undo() {
    let mut history = History::new();
    history.record(entry("s1"));
    assert!(history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn undo_stack_caps_and_evicts_oldest() {
    let mut history = History::new();
    for n in 0..(MAX_HISTORY + 10) {
        history.record(entry(&format!("s{n}")));
    }
    let mut popped = Vec::new();
    while let Some(e) = history.pop_undo() {
        popped.push(e);
    }
    assert_eq!(popped.len(), MAX_HISTORY);
    // The newest entry is on top; the oldest ten were evicted.
    match popped.first() {
        Some(HistoryEntry::AddStroke { stroke, .. }) => {
            assert_eq!(stroke.id, format!("s{}", MAX_HISTORY + 9));
        }
        other => panic!("unexpected entry: {other:?}"),
    }
    match popped.last() {
        Some(HistoryEntry::AddStroke { stroke, .. }) => assert_eq!(stroke.id, "s10"),
        other => panic!("unexpected entry: {other:?}"),
    }
}

#[test]
fn record_clears_redo() {
    let mut history = History::new();
    history.record(entry("s1"));
    let undone = history.pop_undo().unwrap();
    history.push_redo(undone);
    assert!(history.can_redo());

    history.record(entry("s2"));
    assert!(!history.can_redo());
}

// =============================================================
// Batching
// =============================================================

#[test]
fn empty_batch_records_nothing() {
    let mut history = History::new();
    history.start_batch();
    assert!(!history.end_batch());
    assert!(!history.can_undo());
}

#[test]
fn single_entry_batch_collapses() {
    let mut history = History::new();
    history.start_batch();
    history.record(entry("s1"));
    assert!(history.end_batch());
    match history.pop_undo() {
        Some(HistoryEntry::AddStroke { .. }) => {}
        other => panic!("expected bare entry, got {other:?}"),
    }
}

#[test]
fn multi_entry_batch_becomes_one_unit() {
    let mut history = History::new();
    history.start_batch();
    history.record(entry("s1"));
    history.record(entry("s2"));
    assert!(history.end_batch());
    match history.pop_undo() {
        Some(HistoryEntry::Batch(entries)) => assert_eq!(entries.len(), 2),
        other => panic!("expected batch, got {other:?}"),
    }
    assert!(history.pop_undo().is_none());
}

#[test]
fn nested_start_batch_is_a_noop() {
    let mut history = History::new();
    history.start_batch();
    history.start_batch();
    history.record(entry("s1"));
    history.record(entry("s2"));
    assert!(history.end_batch());
    // A second end has nothing to close.
    assert!(!history.end_batch());
}

#[test]
fn clear_forgets_everything() {
    let mut history = History::new();
    history.record(entry("s1"));
    history.start_batch();
    history.record(entry("s2"));
    history.clear();
    assert!(!history.can_undo());
    assert!(!history.can_redo());
    assert!(!history.end_batch());
}

// =============================================================
// Undo/redo through a session
// =============================================================

#[test]
fn undo_with_empty_stack_returns_false() {
    let mut session = BoardSession::new("node-a");
    assert!(!session.undo());
    assert!(!session.redo());
}

#[test]
fn add_stroke_undo_redo_roundtrip() {
    let mut session = BoardSession::new("node-a");
    session.add_stroke(stroke("s1"));
    assert_eq!(session.current_page().strokes.len(), 1);

    assert!(session.undo());
    assert!(session.current_page().strokes.is_empty());
    assert!(session.can_redo());

    assert!(session.redo());
    assert_eq!(session.current_page().strokes.len(), 1);
    assert_eq!(session.current_page().strokes[0].id, "s1");
}

#[test]
fn move_undo_restores_positions() {
    let mut session = BoardSession::new("node-a");
    session.add_stroke(stroke("s1"));
    session.select_items(&["s1".to_string()]);
    assert_eq!(session.move_selected(7.0, -3.0), 1);

    assert!(session.undo());
    let point = session.current_page().strokes[0].points[0];
    assert!((point.x - 0.0).abs() < f64::EPSILON);
    assert!((point.y - 0.0).abs() < f64::EPSILON);

    assert!(session.redo());
    let point = session.current_page().strokes[0].points[0];
    assert!((point.x - 7.0).abs() < f64::EPSILON);
    assert!((point.y + 3.0).abs() < f64::EPSILON);
}

#[test]
fn batch_undoes_as_one_unit() {
    let mut session = BoardSession::new("node-a");
    session.start_batch();
    session.add_stroke(stroke("s1"));
    session.add_stroke(stroke("s2"));
    session.add_stroke(stroke("s3"));
    assert!(session.end_batch());
    assert_eq!(session.current_page().strokes.len(), 3);

    assert!(session.undo());
    assert!(session.current_page().strokes.is_empty());

    assert!(session.redo());
    assert_eq!(session.current_page().strokes.len(), 3);
}

#[test]
fn delete_undo_restores_item_order() {
    let mut session = BoardSession::new("node-a");
    session.add_stroke(stroke("s1"));
    session.add_stroke(stroke("s2"));
    session.add_stroke(stroke("s3"));
    session.select_items(&["s2".to_string()]);
    assert_eq!(session.delete_selected(), 1);

    assert!(session.undo());
    let ids: Vec<&str> = session
        .current_page()
        .strokes
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, ["s1", "s2", "s3"]);
}

#[test]
fn group_lifecycle_undo_redo_is_identity() {
    let mut session = BoardSession::new("node-a");
    session.add_stroke(stroke("s1"));
    session.add_stroke(stroke("s2"));
    let group = session
        .create_group(&["s1".to_string(), "s2".to_string()])
        .unwrap();
    assert!(session.delete_group(&group.id));
    assert!(session.current_page().groups.is_empty());

    // Undo the dissolve, then the creation.
    assert!(session.undo());
    assert_eq!(session.current_page().groups.len(), 1);
    assert_eq!(session.current_page().groups[0].id, group.id);
    assert!(session.undo());
    assert!(session.current_page().groups.is_empty());

    // Redo both; the document ends where it started.
    assert!(session.redo());
    assert!(session.redo());
    assert!(session.current_page().groups.is_empty());
    assert_eq!(session.current_page().strokes.len(), 2);
}

#[test]
fn lock_undo_restores_previous_state() {
    let mut session = BoardSession::new("node-a");
    session.add_stroke(stroke("s1"));
    assert!(session.lock_items(&["s1".to_string()], "alice"));
    assert!(session.is_item_locked("s1"));

    assert!(session.undo());
    assert!(!session.is_item_locked("s1"));

    assert!(session.redo());
    assert!(session.is_item_locked("s1"));
}

#[test]
fn sticky_text_undo_restores_previous_text() {
    let mut session = BoardSession::new("node-a");
    session.add_asset(crate::doc::Asset {
        id: "a1".to_string(),
        kind: crate::doc::AssetKind::Sticky,
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
        src: None,
        text: Some("before".to_string()),
        locked: false,
        locked_by: None,
    });
    assert!(session.set_sticky_text("a1", "after"));
    assert_eq!(session.current_page().assets[0].text.as_deref(), Some("after"));

    assert!(session.undo());
    assert_eq!(session.current_page().assets[0].text.as_deref(), Some("before"));

    assert!(session.redo());
    assert_eq!(session.current_page().assets[0].text.as_deref(), Some("after"));
}

#[test]
fn new_mutation_after_undo_discards_redo() {
    let mut session = BoardSession::new("node-a");
    session.add_stroke(stroke("s1"));
    session.undo();
    assert!(session.can_redo());

    session.add_stroke(stroke("s2"));
    assert!(!session.can_redo());
}
