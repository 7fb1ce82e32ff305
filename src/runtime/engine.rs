//! Operation recording engine with per-session undo/redo.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    core::{classify::classify, diff::compute_diff, stack::UndoRedoStacks},
    identity::IdentityContext,
    operation::{GroupOperation, Operation, RecordOptions},
    persist::{GroupHistoryPage, HistoryFilter, OperationStore, StoreError, StoreResult, UndoRedoOutcome},
    types::{BatchId, DeviceId, OpKind, ProducerType, SessionId, SyncStatus, UserId},
};

use super::{
    achieve::{AchievementCounts, AchievementSink, NoopAchievements},
    events::Broadcaster,
};

/// Errors surfaced by undo/redo requests.
#[derive(Debug)]
pub enum UndoRedoError {
    /// The undo stack is empty; no remote call was made.
    NothingToUndo,
    /// The redo stack is empty; no remote call was made.
    NothingToRedo,
    /// The store rejected the request on eligibility grounds; the popped
    /// entry was restored to its source stack.
    Ineligible(StoreError),
    /// The remote call itself failed; the popped entry was restored to its
    /// source stack.
    Store(StoreError),
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on each undo/redo stack.
    pub max_stack_depth: usize,
    /// Buffered events per broadcast channel.
    pub broadcast_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: crate::core::stack::DEFAULT_MAX_DEPTH,
            broadcast_capacity: 1024,
        }
    }
}

#[derive(Debug)]
struct OpenBatch {
    id: BatchId,
    next_sequence: u32,
}

impl OpenBatch {
    fn take_sequence(&mut self) -> u32 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }
}

#[derive(Default)]
struct RecordCounters {
    by_kind: HashMap<(UserId, OpKind), u64>,
    by_table: HashMap<(UserId, String), u64>,
    totals: HashMap<UserId, u64>,
}

impl RecordCounters {
    fn bump(&mut self, user_id: &str, kind: OpKind, target_table: &str) -> AchievementCounts {
        let for_kind = self
            .by_kind
            .entry((user_id.to_string(), kind))
            .and_modify(|c| *c += 1)
            .or_insert(1);
        let for_kind = *for_kind;
        let for_table = self
            .by_table
            .entry((user_id.to_string(), target_table.to_string()))
            .and_modify(|c| *c += 1)
            .or_insert(1);
        let for_table = *for_table;
        let total = self
            .totals
            .entry(user_id.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        AchievementCounts {
            for_kind,
            for_table,
            total: *total,
        }
    }
}

struct EngineState {
    stacks: UndoRedoStacks,
    batch: Option<OpenBatch>,
    counters: RecordCounters,
    broadcaster: Broadcaster,
}

/// Records mutations, sequences undo/redo against the remote store, and
/// fans out side effects.
///
/// One engine owns one session's identity, stacks, and batch state; create
/// independent engines for independent sessions. All methods take `&self`;
/// stack and batch state live behind an internal mutex so push/pop stay
/// atomic relative to the paired remote call's completion.
pub struct HistoryEngine {
    identity: IdentityContext,
    store: Arc<Mutex<Box<dyn OperationStore>>>,
    state: Mutex<EngineState>,
    achievements: Arc<dyn AchievementSink>,
}

impl HistoryEngine {
    /// Creates an engine over `store` with default side-effect sinks.
    pub fn new(identity: IdentityContext, store: Box<dyn OperationStore>, config: EngineConfig) -> Self {
        Self {
            identity,
            store: Arc::new(Mutex::new(store)),
            state: Mutex::new(EngineState {
                stacks: UndoRedoStacks::new(config.max_stack_depth),
                batch: None,
                counters: RecordCounters::default(),
                broadcaster: Broadcaster::new(config.broadcast_capacity),
            }),
            achievements: Arc::new(NoopAchievements),
        }
    }

    /// Replaces the achievement sink.
    pub fn with_achievements(mut self, sink: Arc<dyn AchievementSink>) -> Self {
        self.achievements = sink;
        self
    }

    /// Session id tagged onto every operation this engine records.
    pub fn session_id(&self) -> SessionId {
        self.identity.session_id()
    }

    /// Device id tagged onto every operation this engine records.
    pub fn device_id(&self) -> DeviceId {
        self.identity.device_id()
    }

    /// Records one mutation: computes the diff and security level, persists
    /// the operation, then commits it to the undo stack, clears the redo
    /// stack, broadcasts it, and fires the achievement trigger.
    ///
    /// Returns `None` when persistence fails (or both states are absent);
    /// no local state is mutated in that case.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        user_id: &str,
        kind: OpKind,
        target_table: &str,
        target_id: &str,
        previous_state: Option<Value>,
        next_state: Option<Value>,
        options: RecordOptions,
    ) -> Option<Operation> {
        if previous_state.is_none() && next_state.is_none() {
            warn!(user_id, ?kind, target_table, "record rejected: both states absent");
            return None;
        }

        let diff = compute_diff(previous_state.as_ref(), next_state.as_ref());
        let security_level = options
            .security_level
            .unwrap_or_else(|| classify(kind, target_table));

        let (batch_id, batch_sequence) = {
            let mut state = self.state.lock().await;
            match (options.batch_id, state.batch.as_mut()) {
                (Some(explicit), Some(open)) if explicit == open.id => {
                    (Some(open.id), Some(open.take_sequence()))
                }
                (Some(explicit), _) => (Some(explicit), None),
                (None, Some(open)) => (Some(open.id), Some(open.take_sequence())),
                (None, None) => (None, None),
            }
        };

        let op = Operation {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            session_id: self.identity.session_id(),
            device_id: Some(self.identity.device_id()),
            canvas_id: options.canvas_id,
            folder_id: options.folder_id,
            kind,
            target_table: target_table.to_string(),
            target_id: target_id.to_string(),
            target_title: options.target_title,
            previous_state,
            next_state,
            changes_diff: diff.changes_diff,
            affected_fields: diff.affected_fields,
            batch_id,
            batch_sequence,
            is_undone: false,
            undone_at_ms: None,
            sync_status: SyncStatus::Pending,
            producer_type: options.producer_type.unwrap_or(ProducerType::User),
            producer_id: options.producer_id,
            producer_context: options.producer_context,
            permission_used: options.permission_used,
            security_level,
            created_at_ms: 0,
        };

        let stored = match self.with_store(move |s| s.persist(&op)).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(user_id, ?kind, target_table, error = ?err, "persist failed");
                return None;
            }
        };

        let group_op = match options.group {
            Some(projection) => {
                let draft = GroupOperation {
                    id: Uuid::new_v4(),
                    group_id: projection.group_id,
                    operation_id: stored.id,
                    user_id: stored.user_id.clone(),
                    summary: projection.summary,
                    icon: projection.icon,
                    privacy: projection.privacy,
                    is_visible: true,
                    reaction_count: 0,
                    comment_count: 0,
                    created_at_ms: 0,
                };
                match self.with_store(move |s| s.persist_group(&draft)).await {
                    Ok(stored_group) => Some(stored_group),
                    Err(err) => {
                        warn!(error = ?err, "group projection persist failed");
                        None
                    }
                }
            }
            None => None,
        };

        let counts = {
            let mut state = self.state.lock().await;
            state.stacks.push_record(stored.clone());
            state.broadcaster.publish(&stored);
            if let Some(group_op) = &group_op {
                state.broadcaster.publish_group(group_op);
            }
            state.counters.bump(user_id, kind, target_table)
        };

        if !options.skip_achievements {
            let sink = Arc::clone(&self.achievements);
            let user = stored.user_id.clone();
            let table = stored.target_table.clone();
            tokio::spawn(async move {
                match sink.on_operation_recorded(&user, kind, &table, counts) {
                    Ok(keys) if !keys.is_empty() => {
                        debug!(user_id = %user, ?keys, "achievements unlocked");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(user_id = %user, %err, "achievement sink failed"),
                }
            });
        }

        Some(stored)
    }

    /// Undoes the most recent operation on the stack via the store's
    /// idempotent undo procedure.
    ///
    /// On success the entry moves to the redo stack; on any failure it is
    /// restored to the undo stack.
    pub async fn undo(&self, user_id: &str) -> Result<UndoRedoOutcome, UndoRedoError> {
        let mut popped = {
            let mut state = self.state.lock().await;
            state.stacks.pop_undo().ok_or(UndoRedoError::NothingToUndo)?
        };

        let op_id = popped.id;
        let user = user_id.to_string();
        match self.with_store(move |s| s.undo(op_id, &user)).await {
            Ok(outcome) => {
                popped.is_undone = true;
                popped.undone_at_ms = Some(now_ms());
                self.state.lock().await.stacks.push_redo(popped);
                Ok(outcome)
            }
            Err(err) => {
                self.state.lock().await.stacks.push_undo(popped);
                Err(map_undo_redo_err(err))
            }
        }
    }

    /// Reapplies the most recently undone operation via the store's
    /// idempotent redo procedure.
    ///
    /// On success the entry moves back to the undo stack; on any failure it
    /// is restored to the redo stack.
    pub async fn redo(&self, user_id: &str) -> Result<UndoRedoOutcome, UndoRedoError> {
        let mut popped = {
            let mut state = self.state.lock().await;
            state.stacks.pop_redo().ok_or(UndoRedoError::NothingToRedo)?
        };

        let op_id = popped.id;
        let user = user_id.to_string();
        match self.with_store(move |s| s.redo(op_id, &user)).await {
            Ok(outcome) => {
                popped.is_undone = false;
                popped.undone_at_ms = None;
                self.state.lock().await.stacks.push_undo(popped);
                Ok(outcome)
            }
            Err(err) => {
                self.state.lock().await.stacks.push_redo(popped);
                Err(map_undo_redo_err(err))
            }
        }
    }

    /// True when an undo target exists.
    pub async fn can_undo(&self) -> bool {
        self.state.lock().await.stacks.can_undo()
    }

    /// True when a redo target exists.
    pub async fn can_redo(&self) -> bool {
        self.state.lock().await.stacks.can_redo()
    }

    /// Next undo target, if any.
    pub async fn peek_undo(&self) -> Option<Operation> {
        self.state.lock().await.stacks.peek_undo().cloned()
    }

    /// Next redo target, if any.
    pub async fn peek_redo(&self) -> Option<Operation> {
        self.state.lock().await.stacks.peek_redo().cloned()
    }

    /// Current undo depth.
    pub async fn undo_depth(&self) -> usize {
        self.state.lock().await.stacks.undo_depth()
    }

    /// Current redo depth.
    pub async fn redo_depth(&self) -> usize {
        self.state.lock().await.stacks.redo_depth()
    }

    /// Opens a batch and returns its id; subsequent records join it with
    /// engine-assigned sequence numbers until `end_batch`.
    pub async fn start_batch(&self) -> BatchId {
        let id = Uuid::new_v4();
        self.state.lock().await.batch = Some(OpenBatch {
            id,
            next_sequence: 0,
        });
        id
    }

    /// Closes the open batch, if any.
    pub async fn end_batch(&self) {
        self.state.lock().await.batch = None;
    }

    /// Id of the open batch, if any.
    pub async fn current_batch_id(&self) -> Option<BatchId> {
        self.state.lock().await.batch.as_ref().map(|b| b.id)
    }

    /// Subscribes to one user's persisted operations.
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Operation> {
        self.state.lock().await.broadcaster.subscribe(user_id)
    }

    /// Subscribes to one group's visible projections.
    pub async fn subscribe_group(&self, group_id: &str) -> broadcast::Receiver<GroupOperation> {
        self.state.lock().await.broadcaster.subscribe_group(group_id)
    }

    /// Most-recent-first operation history for a user.
    pub async fn load_history(
        &self,
        user_id: &str,
        filter: HistoryFilter,
    ) -> StoreResult<Vec<Operation>> {
        let user = user_id.to_string();
        self.with_store(move |s| s.load_history(&user, &filter)).await
    }

    /// Most-recent-first page over a group's visible projections.
    pub async fn load_group_history(
        &self,
        group_id: &str,
        page: GroupHistoryPage,
    ) -> StoreResult<Vec<GroupOperation>> {
        let group = group_id.to_string();
        self.with_store(move |s| s.load_group_history(&group, &page))
            .await
    }

    async fn with_store<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn OperationStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut guard = store.blocking_lock();
            f(guard.as_mut())
        })
        .await
        .map_err(|e| StoreError::Message(format!("join error: {e}")))?
    }
}

fn map_undo_redo_err(err: StoreError) -> UndoRedoError {
    if err.is_ineligible() {
        UndoRedoError::Ineligible(err)
    } else {
        UndoRedoError::Store(err)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
