//! Bounded undo/redo stack pair over recorded operations.

use std::collections::VecDeque;

use crate::operation::Operation;

/// Default bound on each stack.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Session-local undo and redo stacks of operation references.
///
/// Both stacks are LIFO with FIFO eviction at the bound: pushing onto a full
/// stack drops the oldest entry. The stacks are a cache over remote history;
/// entries are committed only after the paired remote call succeeds.
#[derive(Debug)]
pub struct UndoRedoStacks {
    undo: VecDeque<Operation>,
    redo: VecDeque<Operation>,
    max_depth: usize,
}

impl UndoRedoStacks {
    /// Creates empty stacks bounded at `max_depth` entries each.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Pushes a freshly recorded operation and discards all redo entries.
    pub fn push_record(&mut self, op: Operation) {
        self.push_undo(op);
        self.redo.clear();
    }

    /// Pushes onto the undo stack, evicting the oldest entry at the bound.
    pub fn push_undo(&mut self, op: Operation) {
        self.undo.push_back(op);
        if self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    /// Pushes onto the redo stack, evicting the oldest entry at the bound.
    pub fn push_redo(&mut self, op: Operation) {
        self.redo.push_back(op);
        if self.redo.len() > self.max_depth {
            self.redo.pop_front();
        }
    }

    /// Pops the most recent undoable operation.
    pub fn pop_undo(&mut self) -> Option<Operation> {
        self.undo.pop_back()
    }

    /// Pops the most recent redoable operation.
    pub fn pop_redo(&mut self) -> Option<Operation> {
        self.redo.pop_back()
    }

    /// True when an undo target exists.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// True when a redo target exists.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Next undo target without removing it.
    pub fn peek_undo(&self) -> Option<&Operation> {
        self.undo.back()
    }

    /// Next redo target without removing it.
    pub fn peek_redo(&self) -> Option<&Operation> {
        self.redo.back()
    }

    /// Current undo depth.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Current redo depth.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

impl Default for UndoRedoStacks {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
