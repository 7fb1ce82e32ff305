//! Achievement evaluation boundary.

use crate::types::OpKind;

/// Aggregate counts handed to the achievement sink with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AchievementCounts {
    /// Operations of this kind recorded by the user through this engine.
    pub for_kind: u64,
    /// Operations against this table recorded by the user through this engine.
    pub for_table: u64,
    /// All operations recorded by the user through this engine.
    pub total: u64,
}

/// Downstream achievement evaluator.
///
/// Invoked exactly once per successful record, on a detached task. Failures
/// are logged and swallowed; they never affect the recording caller.
pub trait AchievementSink: Send + Sync {
    /// Evaluates achievement rules for one recorded operation and returns
    /// the keys of any achievements unlocked.
    fn on_operation_recorded(
        &self,
        user_id: &str,
        kind: OpKind,
        target_table: &str,
        counts: AchievementCounts,
    ) -> Result<Vec<String>, String>;
}

/// Default sink that evaluates nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAchievements;

impl AchievementSink for NoopAchievements {
    fn on_operation_recorded(
        &self,
        _user_id: &str,
        _kind: OpKind,
        _target_table: &str,
        _counts: AchievementCounts,
    ) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }
}
