//! Minimal changed-field diff between two entity state snapshots.

use serde_json::{Map, Value};

/// Changed fields between a previous and next state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiffResult {
    /// Changed field name to its next value.
    pub changes_diff: Map<String, Value>,
    /// Names of fields that changed, in next-state key order.
    pub affected_fields: Vec<String>,
}

impl DiffResult {
    /// Returns true when no field changed.
    pub fn is_empty(&self) -> bool {
        self.changes_diff.is_empty() && self.affected_fields.is_empty()
    }
}

/// Computes the changed-field set between `previous` and `next`.
///
/// Both outputs are empty when either state is absent: for a pure create or
/// delete the whole state is the change. Otherwise every key of `next` whose
/// value differs from `previous` at that key lands in both outputs, carrying
/// the next value. Keys present in `previous` but absent from `next` are not
/// surfaced.
pub fn compute_diff(previous: Option<&Value>, next: Option<&Value>) -> DiffResult {
    let (Some(previous), Some(next)) = (previous, next) else {
        return DiffResult::default();
    };

    let Some(next_fields) = next.as_object() else {
        return DiffResult::default();
    };

    let mut out = DiffResult::default();
    for (key, next_value) in next_fields {
        let prev_value = previous.get(key);
        if prev_value != Some(next_value) {
            out.changes_diff.insert(key.clone(), next_value.clone());
            out.affected_fields.push(key.clone());
        }
    }
    out
}
