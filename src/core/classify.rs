//! Security sensitivity classification for operations.

use crate::types::{OpKind, SecurityLevel};

const FOLDER_TABLES: &[&str] = &["folders", "canvas_folders"];
const ACCESS_CONTROL_TABLES: &[&str] = &["roles", "permissions", "user_roles", "role_permissions"];
const SETTINGS_TABLES: &[&str] = &["user_settings", "user_preferences"];

/// Maps an operation kind and target collection to a sensitivity tier.
///
/// Total function: every input maps to a level. Callers may override the
/// result explicitly; nothing else is allowed to pick a level.
pub fn classify(kind: OpKind, target_table: &str) -> SecurityLevel {
    if ACCESS_CONTROL_TABLES.contains(&target_table) {
        return SecurityLevel::Critical;
    }
    if kind == OpKind::Delete && FOLDER_TABLES.contains(&target_table) {
        return SecurityLevel::Critical;
    }
    if kind == OpKind::Delete
        || kind == OpKind::BatchUpdate
        || SETTINGS_TABLES.contains(&target_table)
    {
        return SecurityLevel::Elevated;
    }
    if kind == OpKind::Create || kind == OpKind::Update {
        return SecurityLevel::Normal;
    }
    SecurityLevel::Low
}
