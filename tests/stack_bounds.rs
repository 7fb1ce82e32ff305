use serde_json::json;
use uuid::Uuid;

use canvaslog::{
    core::stack::UndoRedoStacks,
    operation::Operation,
    types::{OpKind, ProducerType, SecurityLevel, SyncStatus},
};

fn op(n: u64) -> Operation {
    Operation {
        id: Uuid::new_v4(),
        user_id: "user-1".to_string(),
        session_id: Uuid::new_v4(),
        device_id: None,
        canvas_id: None,
        folder_id: None,
        kind: OpKind::Update,
        target_table: "canvas_items".to_string(),
        target_id: format!("item-{n}"),
        target_title: None,
        previous_state: Some(json!({"n": n})),
        next_state: Some(json!({"n": n + 1})),
        changes_diff: serde_json::Map::new(),
        affected_fields: vec![],
        batch_id: None,
        batch_sequence: None,
        is_undone: false,
        undone_at_ms: None,
        sync_status: SyncStatus::Synced,
        producer_type: ProducerType::User,
        producer_id: None,
        producer_context: None,
        permission_used: None,
        security_level: SecurityLevel::Normal,
        created_at_ms: n,
    }
}

#[test]
fn undo_stack_never_exceeds_bound_and_evicts_oldest() {
    let mut stacks = UndoRedoStacks::new(5);
    for n in 0..12 {
        stacks.push_record(op(n));
        assert!(stacks.undo_depth() <= 5);
    }

    assert_eq!(stacks.undo_depth(), 5);
    // Oldest seven entries were evicted; the most recent survives on top.
    assert_eq!(stacks.peek_undo().map(|o| o.target_id.as_str()), Some("item-11"));

    let mut popped = Vec::new();
    while let Some(op) = stacks.pop_undo() {
        popped.push(op.target_id);
    }
    assert_eq!(popped, vec!["item-11", "item-10", "item-9", "item-8", "item-7"]);
}

#[test]
fn recording_clears_redo() {
    let mut stacks = UndoRedoStacks::new(10);
    stacks.push_record(op(1));
    stacks.push_record(op(2));

    let undone = stacks.pop_undo().expect("pop");
    stacks.push_redo(undone);
    assert!(stacks.can_redo());

    stacks.push_record(op(3));
    assert!(!stacks.can_redo());
    assert_eq!(stacks.redo_depth(), 0);
    assert_eq!(stacks.undo_depth(), 2);
}

#[test]
fn push_undo_alone_preserves_redo() {
    let mut stacks = UndoRedoStacks::new(10);
    stacks.push_record(op(1));
    let undone = stacks.pop_undo().expect("pop");
    stacks.push_redo(undone);

    // Redo path: the reapplied entry returns to the undo stack without
    // discarding remaining redo entries.
    let redone = stacks.pop_redo().expect("pop redo");
    stacks.push_redo(op(9));
    stacks.push_undo(redone);
    assert!(stacks.can_redo());
    assert!(stacks.can_undo());
}

#[test]
fn peek_matches_pop_order() {
    let mut stacks = UndoRedoStacks::new(10);
    stacks.push_record(op(1));
    stacks.push_record(op(2));

    let peeked = stacks.peek_undo().expect("peek").target_id.clone();
    let popped = stacks.pop_undo().expect("pop").target_id;
    assert_eq!(peeked, popped);
    assert_eq!(popped, "item-2");
}
