/// SQLite implementation of the operation store.
pub mod sqlite;

use serde_json::Value;

use crate::{
    operation::{GroupOperation, Operation},
    types::{CanvasId, GroupOperationId, OpKind, OperationId, SessionId, TargetId},
};

/// Errors surfaced by an operation store.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite failure.
    Sqlite(rusqlite::Error),
    /// Payload (de)serialization failure.
    Serde(serde_json::Error),
    /// No operation with this id exists for the user.
    MissingOperation(OperationId),
    /// Undo requested for an operation already undone.
    AlreadyUndone(OperationId),
    /// Redo requested for an operation that is not undone.
    NotUndone(OperationId),
    /// Any other store failure.
    Message(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

impl StoreError {
    /// True for eligibility failures rather than transport failures.
    pub fn is_ineligible(&self) -> bool {
        matches!(
            self,
            Self::MissingOperation(_) | Self::AlreadyUndone(_) | Self::NotUndone(_)
        )
    }
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Report of an applied undo or redo state transition.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRedoOutcome {
    /// Collection of the affected entity.
    pub target_table: String,
    /// Affected entity identifier.
    pub target_id: TargetId,
    /// State the entity was restored to; `None` when it was removed.
    pub restore_state: Option<Value>,
    /// Kind of the inverted or reapplied operation.
    pub kind: OpKind,
}

/// Filters applied to a user history query.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    /// Restrict to one browsing session.
    pub session_id: Option<SessionId>,
    /// Restrict to one canvas.
    pub canvas_id: Option<CanvasId>,
    /// Maximum rows returned, most recent first.
    pub limit: usize,
    /// Include rows whose operation has been undone.
    pub include_undone: bool,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self {
            session_id: None,
            canvas_id: None,
            limit: 50,
            include_undone: false,
        }
    }
}

/// Page over a group's visible activity feed.
#[derive(Debug, Clone)]
pub struct GroupHistoryPage {
    /// Maximum rows returned, most recent first.
    pub limit: usize,
    /// Rows to skip before the page starts.
    pub offset: usize,
}

impl Default for GroupHistoryPage {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Authoritative store of operation rows, target entity state, and group
/// projections.
///
/// Blocking trait in the style of an op sink; the engine drives it through
/// `spawn_blocking`. `persist` never retries internally. `undo` and `redo`
/// are idempotent with respect to the undone flag: a second undo of the same
/// operation fails eligibility instead of double-applying.
pub trait OperationStore: Send {
    /// Inserts one operation row, applies its next state to the target
    /// entity, and returns the stored row with store-assigned timestamp and
    /// sync status.
    fn persist(&mut self, op: &Operation) -> StoreResult<Operation>;

    /// Inserts one group projection row and returns it as stored.
    fn persist_group(&mut self, group_op: &GroupOperation) -> StoreResult<GroupOperation>;

    /// Applies the inverse state of an operation, marks it undone, and
    /// reports the restored prior state.
    fn undo(&mut self, operation_id: OperationId, user_id: &str) -> StoreResult<UndoRedoOutcome>;

    /// Reapplies the forward state of an undone operation, clears the undone
    /// flag, and reports the restored next state.
    fn redo(&mut self, operation_id: OperationId, user_id: &str) -> StoreResult<UndoRedoOutcome>;

    /// Most-recent-first operation history for a user.
    fn load_history(&mut self, user_id: &str, filter: &HistoryFilter)
    -> StoreResult<Vec<Operation>>;

    /// Most-recent-first page over a group's visible projections.
    fn load_group_history(
        &mut self,
        group_id: &str,
        page: &GroupHistoryPage,
    ) -> StoreResult<Vec<GroupOperation>>;

    /// Increments a projection's reaction counter and returns the new count.
    fn add_group_reaction(&mut self, group_op_id: GroupOperationId) -> StoreResult<u32>;

    /// Increments a projection's comment counter and returns the new count.
    fn add_group_comment(&mut self, group_op_id: GroupOperationId) -> StoreResult<u32>;
}
