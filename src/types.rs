//! Shared identifier aliases and operation-related enums.

use serde::{Deserialize, Serialize};

/// Client-generated operation identifier.
pub type OperationId = uuid::Uuid;
/// Identifier shared by every operation in one batch.
pub type BatchId = uuid::Uuid;
/// Identifier stable for one browsing session.
pub type SessionId = uuid::Uuid;
/// Identifier stable across sessions on one device.
pub type DeviceId = uuid::Uuid;
/// Group projection row identifier.
pub type GroupOperationId = uuid::Uuid;
/// Backend-assigned user identifier.
pub type UserId = String;
/// Canvas/workspace identifier.
pub type CanvasId = String;
/// Folder identifier.
pub type FolderId = String;
/// Collaborative group identifier.
pub type GroupId = String;
/// Identifier of the entity an operation targets.
pub type TargetId = String;

/// Kind of mutation an operation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Entity created.
    Create,
    /// Entity fields updated.
    Update,
    /// Entity deleted.
    Delete,
    /// Entity moved.
    Move,
    /// Entity resized.
    Resize,
    /// Entity z-order changed.
    Reorder,
    /// Entity styling changed.
    StyleChange,
    /// Part of a grouped multi-entity update.
    BatchUpdate,
    /// Undo applied to a prior operation.
    Undo,
    /// Redo applied to a prior operation.
    Redo,
    /// Deleted entity restored.
    Restore,
}

impl OpKind {
    /// Stable string form used by the store layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Resize => "resize",
            Self::Reorder => "reorder",
            Self::StyleChange => "style_change",
            Self::BatchUpdate => "batch_update",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Restore => "restore",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "move" => Self::Move,
            "resize" => Self::Resize,
            "reorder" => Self::Reorder,
            "style_change" => Self::StyleChange,
            "batch_update" => Self::BatchUpdate,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "restore" => Self::Restore,
            _ => return None,
        })
    }
}

/// Reconciliation state of an operation against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not yet acknowledged by the store.
    Pending,
    /// Acknowledged and authoritative.
    Synced,
    /// Conflicting concurrent edit detected; terminal for this layer.
    Conflict,
    /// Conflict resolved externally.
    Resolved,
}

impl SyncStatus {
    /// Stable string form used by the store layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
            Self::Resolved => "resolved",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "synced" => Self::Synced,
            "conflict" => Self::Conflict,
            "resolved" => Self::Resolved,
            _ => return None,
        })
    }
}

/// Actor category that produced an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerType {
    /// Human user.
    User,
    /// Administrative actor.
    Admin,
    /// Automated system process.
    System,
    /// AI agent.
    Ai,
    /// External API caller.
    Api,
    /// Data migration.
    Migration,
    /// Sync reconciliation.
    Sync,
    /// Scheduled job.
    Scheduler,
    /// Database trigger.
    Trigger,
}

impl ProducerType {
    /// Stable string form used by the store layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::System => "system",
            Self::Ai => "ai",
            Self::Api => "api",
            Self::Migration => "migration",
            Self::Sync => "sync",
            Self::Scheduler => "scheduler",
            Self::Trigger => "trigger",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "user" => Self::User,
            "admin" => Self::Admin,
            "system" => Self::System,
            "ai" => Self::Ai,
            "api" => Self::Api,
            "migration" => Self::Migration,
            "sync" => Self::Sync,
            "scheduler" => Self::Scheduler,
            "trigger" => Self::Trigger,
            _ => return None,
        })
    }
}

/// Sensitivity tier assigned to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Routine, low-sensitivity mutation.
    Low,
    /// Ordinary create/update.
    Normal,
    /// Destructive or wide-reaching mutation.
    Elevated,
    /// Structural or access-control mutation.
    Critical,
}

impl SecurityLevel {
    /// Stable string form used by the store layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::Critical => "critical",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "low" => Self::Low,
            "normal" => Self::Normal,
            "elevated" => Self::Elevated,
            "critical" => Self::Critical,
            _ => return None,
        })
    }
}

/// Visibility tier of a group projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Visible to anyone.
    Public,
    /// Visible to group members.
    Group,
    /// Visible to group admins.
    Admin,
    /// Visible only to the actor.
    Private,
}

impl PrivacyLevel {
    /// Stable string form used by the store layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Group => "group",
            Self::Admin => "admin",
            Self::Private => "private",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "public" => Self::Public,
            "group" => Self::Group,
            "admin" => Self::Admin,
            "private" => Self::Private,
            _ => return None,
        })
    }
}
