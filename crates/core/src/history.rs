//! Undo/redo history over store snapshots
//!
//! Two strict LIFO stacks. Element counts are small (tens per session), so
//! whole-state snapshots trade a little memory for correctness simplicity
//! over delta application.

use crate::store::StoreSnapshot;

#[derive(Debug, Default)]
pub struct HistoryManager {
    undo_stack: Vec<StoreSnapshot>,
    redo_stack: Vec<StoreSnapshot>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state as it was *before* a committing operation. Any new
    /// commit discards the redo future.
    pub fn commit(&mut self, before: StoreSnapshot) {
        self.undo_stack.push(before);
        self.redo_stack.clear();
    }

    /// Pop the previous state, parking `current` for redo. `None` on an empty
    /// stack; underflow is not an error.
    pub fn undo(&mut self, current: StoreSnapshot) -> Option<StoreSnapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Mirror of [`HistoryManager::undo`].
    pub fn redo(&mut self, current: StoreSnapshot) -> Option<StoreSnapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
