//! Operation record, record options, and group projection types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{
    BatchId, CanvasId, DeviceId, FolderId, GroupId, GroupOperationId, OpKind, OperationId,
    PrivacyLevel, ProducerType, SecurityLevel, SessionId, SyncStatus, TargetId, UserId,
};

/// Free-form metadata describing what produced an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProducerContext {
    /// Originating surface or feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Tool name for AI-produced operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Function or handler name at the call site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Correlating request identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Operation this one was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_operation_id: Option<OperationId>,
    /// Any extra structured metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Immutable record of one mutation against a content entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation identifier.
    pub id: OperationId,
    /// Acting user.
    pub user_id: UserId,
    /// Browsing session that issued the operation.
    pub session_id: SessionId,
    /// Device that issued the operation, when known.
    pub device_id: Option<DeviceId>,
    /// Canvas/workspace the target belongs to.
    pub canvas_id: Option<CanvasId>,
    /// Folder the target belongs to.
    pub folder_id: Option<FolderId>,
    /// Kind of mutation.
    pub kind: OpKind,
    /// Collection the target entity lives in.
    pub target_table: String,
    /// Target entity identifier.
    pub target_id: TargetId,
    /// Human-readable target title.
    pub target_title: Option<String>,
    /// Entity state before the mutation; `None` for creates.
    pub previous_state: Option<Value>,
    /// Entity state after the mutation; `None` for deletes.
    pub next_state: Option<Value>,
    /// Changed field name to new value; empty when either state is absent.
    pub changes_diff: Map<String, Value>,
    /// Names of fields that changed.
    pub affected_fields: Vec<String>,
    /// Batch this operation belongs to.
    pub batch_id: Option<BatchId>,
    /// Position within the batch.
    pub batch_sequence: Option<u32>,
    /// True once the operation has been undone.
    pub is_undone: bool,
    /// Undo timestamp in milliseconds, set when `is_undone`.
    pub undone_at_ms: Option<u64>,
    /// Reconciliation state against the remote store.
    pub sync_status: SyncStatus,
    /// Actor category that produced the operation.
    pub producer_type: ProducerType,
    /// Producer identifier, when distinct from the user.
    pub producer_id: Option<String>,
    /// Producer metadata.
    pub producer_context: Option<ProducerContext>,
    /// Permission under which the mutation ran.
    pub permission_used: Option<String>,
    /// Sensitivity tier.
    pub security_level: SecurityLevel,
    /// Store-assigned creation timestamp in milliseconds.
    pub created_at_ms: u64,
}

/// Group feed entry an operation should project into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupProjectionDraft {
    /// Group whose feed receives the projection.
    pub group_id: GroupId,
    /// Human-readable summary of the action.
    pub summary: String,
    /// Icon hint for the feed entry.
    pub icon: Option<String>,
    /// Visibility tier.
    pub privacy: PrivacyLevel,
}

/// Optional parameters accepted by `record`.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    /// Human-readable target title.
    pub target_title: Option<String>,
    /// Canvas the target belongs to.
    pub canvas_id: Option<CanvasId>,
    /// Folder the target belongs to.
    pub folder_id: Option<FolderId>,
    /// Explicit batch id for externally coordinated batches.
    pub batch_id: Option<BatchId>,
    /// Producer category; defaults to `ProducerType::User`.
    pub producer_type: Option<ProducerType>,
    /// Producer identifier.
    pub producer_id: Option<String>,
    /// Producer metadata.
    pub producer_context: Option<ProducerContext>,
    /// Permission under which the mutation ran.
    pub permission_used: Option<String>,
    /// Explicit security level override; classified from kind and table otherwise.
    pub security_level: Option<SecurityLevel>,
    /// Skips the achievement trigger when true.
    pub skip_achievements: bool,
    /// Projects the operation into a group activity feed.
    pub group: Option<GroupProjectionDraft>,
}

/// Socially annotated projection of an operation for a group feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOperation {
    /// Projection identifier.
    pub id: GroupOperationId,
    /// Group whose feed this entry belongs to.
    pub group_id: GroupId,
    /// Source operation.
    pub operation_id: OperationId,
    /// Acting user.
    pub user_id: UserId,
    /// Human-readable summary of the action.
    pub summary: String,
    /// Icon hint for the feed entry.
    pub icon: Option<String>,
    /// Visibility tier.
    pub privacy: PrivacyLevel,
    /// False for entries hidden from the feed.
    pub is_visible: bool,
    /// Reaction counter.
    pub reaction_count: u32,
    /// Comment counter.
    pub comment_count: u32,
    /// Store-assigned creation timestamp in milliseconds.
    pub created_at_ms: u64,
}
