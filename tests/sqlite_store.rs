use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use canvaslog::{
    operation::{GroupOperation, Operation, ProducerContext},
    persist::{GroupHistoryPage, HistoryFilter, OperationStore, StoreError, sqlite::SqliteOperationStore},
    types::{OpKind, PrivacyLevel, ProducerType, SecurityLevel, SessionId, SyncStatus},
};

fn draft(
    session_id: SessionId,
    kind: OpKind,
    target_id: &str,
    previous_state: Option<Value>,
    next_state: Option<Value>,
) -> Operation {
    Operation {
        id: Uuid::new_v4(),
        user_id: "user-1".to_string(),
        session_id,
        device_id: Some(Uuid::new_v4()),
        canvas_id: Some("canvas-1".to_string()),
        folder_id: None,
        kind,
        target_table: "canvas_items".to_string(),
        target_id: target_id.to_string(),
        target_title: Some(format!("title {target_id}")),
        previous_state,
        next_state,
        changes_diff: serde_json::Map::new(),
        affected_fields: vec![],
        batch_id: None,
        batch_sequence: None,
        is_undone: false,
        undone_at_ms: None,
        sync_status: SyncStatus::Pending,
        producer_type: ProducerType::User,
        producer_id: None,
        producer_context: Some(ProducerContext {
            source: Some("test".to_string()),
            ..ProducerContext::default()
        }),
        permission_used: None,
        security_level: SecurityLevel::Normal,
        created_at_ms: 0,
    }
}

#[test]
fn persist_applies_next_state_and_returns_synced_row() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session = Uuid::new_v4();

    let next = json!({"x": 10, "label": "note"});
    let op = draft(session, OpKind::Create, "item-a", None, Some(next.clone()));
    let stored = store.persist(&op).expect("persist");

    assert_eq!(stored.sync_status, SyncStatus::Synced);
    assert!(stored.created_at_ms > 0);
    assert_eq!(
        store.entity_state("canvas_items", "item-a").expect("state"),
        Some(next)
    );

    let reloaded = store.operation(op.id).expect("lookup").expect("row");
    assert_eq!(reloaded, stored);
}

#[test]
fn undo_restores_previous_state_and_marks_undone() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session = Uuid::new_v4();

    let op = draft(session, OpKind::Create, "item-a", None, Some(json!({"x": 1})));
    store.persist(&op).expect("persist");

    let outcome = store.undo(op.id, "user-1").expect("undo");
    assert_eq!(outcome.target_table, "canvas_items");
    assert_eq!(outcome.target_id, "item-a");
    assert_eq!(outcome.kind, OpKind::Create);
    // A create has no previous state: undoing it removes the entity.
    assert_eq!(outcome.restore_state, None);
    assert_eq!(store.entity_state("canvas_items", "item-a").expect("state"), None);

    let row = store.operation(op.id).expect("lookup").expect("row");
    assert!(row.is_undone);
    assert!(row.undone_at_ms.is_some());
}

#[test]
fn double_undo_is_ineligible_and_does_not_double_apply() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session = Uuid::new_v4();

    let prev = json!({"x": 1});
    let next = json!({"x": 2});
    let op = draft(
        session,
        OpKind::Update,
        "item-a",
        Some(prev.clone()),
        Some(next),
    );
    store.persist(&op).expect("persist");

    store.undo(op.id, "user-1").expect("first undo");
    assert_eq!(
        store.entity_state("canvas_items", "item-a").expect("state"),
        Some(prev.clone())
    );

    match store.undo(op.id, "user-1") {
        Err(StoreError::AlreadyUndone(id)) => assert_eq!(id, op.id),
        other => panic!("expected AlreadyUndone, got {other:?}"),
    }
    assert_eq!(
        store.entity_state("canvas_items", "item-a").expect("state"),
        Some(prev)
    );
}

#[test]
fn undo_then_redo_round_trips_to_next_state() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session = Uuid::new_v4();

    let next = json!({"x": 2, "style": {"color": "blue"}});
    let op = draft(
        session,
        OpKind::Update,
        "item-a",
        Some(json!({"x": 1})),
        Some(next.clone()),
    );
    store.persist(&op).expect("persist");

    match store.redo(op.id, "user-1") {
        Err(StoreError::NotUndone(id)) => assert_eq!(id, op.id),
        other => panic!("expected NotUndone, got {other:?}"),
    }

    store.undo(op.id, "user-1").expect("undo");
    let outcome = store.redo(op.id, "user-1").expect("redo");
    assert_eq!(outcome.restore_state, Some(next.clone()));
    assert_eq!(
        store.entity_state("canvas_items", "item-a").expect("state"),
        Some(next)
    );

    let row = store.operation(op.id).expect("lookup").expect("row");
    assert!(!row.is_undone);
    assert_eq!(row.undone_at_ms, None);
}

#[test]
fn undo_for_unknown_operation_is_missing() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let ghost = Uuid::new_v4();
    match store.undo(ghost, "user-1") {
        Err(StoreError::MissingOperation(id)) => assert_eq!(id, ghost),
        other => panic!("expected MissingOperation, got {other:?}"),
    }
}

#[test]
fn history_is_most_recent_first_and_excludes_undone() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session = Uuid::new_v4();

    let mut ids = Vec::new();
    for name in ["item-a", "item-b", "item-c"] {
        let op = draft(session, OpKind::Create, name, None, Some(json!({"n": name})));
        ids.push(store.persist(&op).expect("persist").id);
    }

    let rows = store
        .load_history("user-1", &HistoryFilter::default())
        .expect("history");
    let targets: Vec<&str> = rows.iter().map(|r| r.target_id.as_str()).collect();
    assert_eq!(targets, vec!["item-c", "item-b", "item-a"]);

    store.undo(ids[2], "user-1").expect("undo c");
    let rows = store
        .load_history("user-1", &HistoryFilter::default())
        .expect("history");
    let targets: Vec<&str> = rows.iter().map(|r| r.target_id.as_str()).collect();
    assert_eq!(targets, vec!["item-b", "item-a"]);

    let rows = store
        .load_history(
            "user-1",
            &HistoryFilter {
                include_undone: true,
                ..HistoryFilter::default()
            },
        )
        .expect("history");
    assert_eq!(rows.len(), 3);
}

#[test]
fn history_filters_by_session_canvas_and_limit() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session_a = Uuid::new_v4();
    let session_b = Uuid::new_v4();

    for n in 0..4 {
        let op = draft(session_a, OpKind::Create, &format!("a-{n}"), None, Some(json!({"n": n})));
        store.persist(&op).expect("persist");
    }
    let mut other = draft(session_b, OpKind::Create, "b-0", None, Some(json!({"n": 9})));
    other.canvas_id = Some("canvas-2".to_string());
    store.persist(&other).expect("persist");

    let rows = store
        .load_history(
            "user-1",
            &HistoryFilter {
                session_id: Some(session_b),
                ..HistoryFilter::default()
            },
        )
        .expect("history");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].target_id, "b-0");

    let rows = store
        .load_history(
            "user-1",
            &HistoryFilter {
                canvas_id: Some("canvas-1".to_string()),
                ..HistoryFilter::default()
            },
        )
        .expect("history");
    assert_eq!(rows.len(), 4);

    let rows = store
        .load_history(
            "user-1",
            &HistoryFilter {
                limit: 2,
                ..HistoryFilter::default()
            },
        )
        .expect("history");
    assert_eq!(rows.len(), 2);
}

#[test]
fn reopen_preserves_rows_and_entity_state() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("ops.db");
    let session = Uuid::new_v4();

    let op = draft(session, OpKind::Create, "item-a", None, Some(json!({"x": 1})));
    {
        let mut store = SqliteOperationStore::open(&db_path).expect("open");
        store.persist(&op).expect("persist");
    }

    let mut store = SqliteOperationStore::open(&db_path).expect("reopen");
    let rows = store
        .load_history("user-1", &HistoryFilter::default())
        .expect("history");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, op.id);
    assert_eq!(
        store.entity_state("canvas_items", "item-a").expect("state"),
        Some(json!({"x": 1}))
    );
}

#[test]
fn group_feed_pages_visible_rows_and_bumps_counters() {
    let mut store = SqliteOperationStore::open_in_memory().expect("open");
    let session = Uuid::new_v4();

    let op = draft(session, OpKind::Create, "item-a", None, Some(json!({"x": 1})));
    let stored = store.persist(&op).expect("persist");

    let group_op = GroupOperation {
        id: Uuid::new_v4(),
        group_id: "group-1".to_string(),
        operation_id: stored.id,
        user_id: stored.user_id.clone(),
        summary: "created a note".to_string(),
        icon: Some("note".to_string()),
        privacy: PrivacyLevel::Group,
        is_visible: true,
        reaction_count: 0,
        comment_count: 0,
        created_at_ms: 0,
    };
    store.persist_group(&group_op).expect("persist group");

    let hidden = GroupOperation {
        id: Uuid::new_v4(),
        is_visible: false,
        ..group_op.clone()
    };
    store.persist_group(&hidden).expect("persist hidden");

    let feed = store
        .load_group_history("group-1", &GroupHistoryPage::default())
        .expect("feed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, group_op.id);

    assert_eq!(store.add_group_reaction(group_op.id).expect("react"), 1);
    assert_eq!(store.add_group_reaction(group_op.id).expect("react"), 2);
    assert_eq!(store.add_group_comment(group_op.id).expect("comment"), 1);

    let feed = store
        .load_group_history("group-1", &GroupHistoryPage::default())
        .expect("feed");
    assert_eq!(feed[0].reaction_count, 2);
    assert_eq!(feed[0].comment_count, 1);
}
