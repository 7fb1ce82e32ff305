/// Structural diff between entity state snapshots.
pub mod diff;
/// Security sensitivity classification.
pub mod classify;
/// Bounded undo/redo stack pair.
pub mod stack;
