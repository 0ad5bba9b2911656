// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of motion edits.
//!
//! Every edit is stored as a pair of serialized track snapshots (before and
//! after). Undo restores `before`, redo restores `after`. A clean marker
//! remembers which entry matched the last saved project.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Default undo history depth
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Unique operation ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationID(u64);

/// Bincode-encoded state captured around an edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    data: Vec<u8>,
}

impl StateSnapshot {
    /// Encode a value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(value)?,
        })
    }

    /// Decode the stored value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// One undoable change: the state before and after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID
    pub id: OperationID,
    /// Human-readable description
    pub description: String,
    /// Restored by undo
    pub before: StateSnapshot,
    /// Restored by redo
    pub after: StateSnapshot,
}

impl Operation {
    /// Create a new operation
    pub fn new(
        id: OperationID,
        description: String,
        before: StateSnapshot,
        after: StateSnapshot,
    ) -> Self {
        Self {
            id,
            description,
            before,
            after,
        }
    }

    fn memory_size(&self) -> usize {
        self.before.size() + self.after.size()
    }
}

/// Operations undone and redone as one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationGroup {
    /// Group ID
    pub id: OperationID,
    /// Shown in the undo/redo menu
    pub description: String,
    /// Operations in the order they were applied
    pub operations: Vec<Operation>,
}

impl OperationGroup {
    /// Create an empty group
    pub fn new(id: OperationID, description: String) -> Self {
        Self {
            id,
            description,
            operations: Vec::new(),
        }
    }

    /// Append an operation
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Encoded size of every operation
    pub fn memory_size(&self) -> usize {
        self.operations.iter().map(Operation::memory_size).sum()
    }
}

/// History statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Total groups in undo stack
    pub undo_count: usize,
    /// Total groups in redo stack
    pub redo_count: usize,
    /// Total memory used by the undo stack (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Where the saved state sits relative to the undo stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanMarker {
    /// Saved with this group on top of the undo stack (`None`: empty stack)
    At(Option<OperationID>),
    /// The saved state was evicted or discarded and cannot come back
    Lost,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    /// Undo stack
    undo_stack: VecDeque<OperationGroup>,
    /// Redo stack
    redo_stack: VecDeque<OperationGroup>,
    /// Next operation ID
    next_id: u64,
    /// Maximum history depth
    max_depth: usize,
    /// Total memory used
    memory_used: usize,
    /// Saved-state marker
    clean: CleanMarker,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_HISTORY_DEPTH)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth: max_depth.max(1),
            memory_used: 0,
            clean: CleanMarker::At(None),
        }
    }

    /// Begin a new operation
    pub fn begin_operation(&mut self) -> OperationID {
        let id = OperationID(self.next_id);
        self.next_id += 1;
        id
    }

    /// Commit an operation group
    ///
    /// Empty groups are dropped. Committing discards the redo stack.
    pub fn commit(&mut self, group: OperationGroup) {
        if group.operations.is_empty() {
            return;
        }

        if self.redo_stack.iter().any(|g| self.clean == CleanMarker::At(Some(g.id))) {
            self.clean = CleanMarker::Lost;
        }
        self.redo_stack.clear();

        self.memory_used += group.memory_size();
        tracing::debug!("Committed '{}' ({} bytes)", group.description, group.memory_size());
        self.undo_stack.push_back(group);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old_group) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old_group.memory_size());
                self.clean = match self.clean {
                    CleanMarker::At(None) => CleanMarker::Lost,
                    // The saved state is now the bottom of the stack.
                    CleanMarker::At(Some(id)) if id == old_group.id => CleanMarker::At(None),
                    other => other,
                };
            }
        }
    }

    /// Group the next undo would revert
    pub fn next_undo(&self) -> Option<&OperationGroup> {
        self.undo_stack.back()
    }

    /// Group the next redo would reapply
    pub fn next_redo(&self) -> Option<&OperationGroup> {
        self.redo_stack.back()
    }

    /// Undo the last operation
    pub fn undo(&mut self) -> Result<OperationGroup> {
        let group = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        self.memory_used = self.memory_used.saturating_sub(group.memory_size());
        self.redo_stack.push_back(group.clone());

        Ok(group)
    }

    /// Redo the last undone operation
    pub fn redo(&mut self) -> Result<OperationGroup> {
        let group = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        self.memory_used += group.memory_size();
        self.undo_stack.push_back(group.clone());

        Ok(group)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum number of undoable groups
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Clear all history; the current state becomes the clean state
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
        self.clean = CleanMarker::At(None);
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.next_undo().map(|g| g.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.next_redo().map(|g| g.description.as_str())
    }

    fn top(&self) -> Option<OperationID> {
        self.undo_stack.back().map(|g| g.id)
    }

    /// Remember the current position as the saved state
    pub fn mark_clean(&mut self) {
        self.clean = CleanMarker::At(self.top());
    }

    /// Whether the current position matches the saved state
    pub fn is_clean(&self) -> bool {
        self.clean == CleanMarker::At(self.top())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(history: &mut History, name: &str) -> OperationGroup {
        let id = history.begin_operation();
        let mut group = OperationGroup::new(id, name.to_string());
        let before = StateSnapshot::from_value(&vec![1u32]).unwrap();
        let after = StateSnapshot::from_value(&vec![1u32, 2]).unwrap();
        group.add_operation(Operation::new(id, name.to_string(), before, after));
        group
    }

    #[test]
    fn test_undo_redo_order() {
        let mut history = History::new();
        let a = group(&mut history, "a");
        let b = group(&mut history, "b");
        history.commit(a);
        history.commit(b);

        assert_eq!(history.undo_description(), Some("b"));
        assert_eq!(history.undo().unwrap().description, "b");
        assert_eq!(history.redo_description(), Some("b"));
        assert_eq!(history.redo().unwrap().description, "b");
        assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_next_undo_does_not_consume() {
        let mut history = History::new();
        let a = group(&mut history, "a");
        history.commit(a);
        assert_eq!(history.next_undo().map(|g| g.description.as_str()), Some("a"));
        assert!(history.can_undo());
        assert!(history.next_redo().is_none());

        history.undo().unwrap();
        let snapshot: Vec<u32> = history.next_redo().unwrap().operations[0].before.to_value().unwrap();
        assert_eq!(snapshot, vec![1]);
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut history = History::new();
        let a = group(&mut history, "a");
        history.commit(a);
        history.undo().unwrap();
        assert!(history.can_redo());
        let b = group(&mut history, "b");
        history.commit(b);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_group_dropped() {
        let mut history = History::new();
        let id = history.begin_operation();
        history.commit(OperationGroup::new(id, "noop".to_string()));
        assert!(!history.can_undo());
        assert!(matches!(history.undo(), Err(HistoryError::NothingToUndo)));
    }

    #[test]
    fn test_depth_limit_and_memory() {
        let mut history = History::with_max_depth(2);
        for name in ["a", "b", "c"] {
            let g = group(&mut history, name);
            history.commit(g);
        }
        let stats = history.stats();
        assert_eq!(stats.undo_count, 2);
        assert!(stats.memory_used > 0);
        history.undo().unwrap();
        history.undo().unwrap();
        assert!(!history.can_undo());
        assert_eq!(history.stats().memory_used, 0);
    }

    #[test]
    fn test_clean_marker_follows_undo_redo() {
        let mut history = History::new();
        assert!(history.is_clean());
        let a = group(&mut history, "a");
        history.commit(a);
        assert!(!history.is_clean());
        history.mark_clean();
        assert!(history.is_clean());

        history.undo().unwrap();
        assert!(!history.is_clean());
        history.redo().unwrap();
        assert!(history.is_clean());
    }

    #[test]
    fn test_clean_marker_lost_on_branch() {
        let mut history = History::new();
        let a = group(&mut history, "a");
        history.commit(a);
        history.mark_clean();
        history.undo().unwrap();
        let b = group(&mut history, "b");
        history.commit(b);
        history.undo().unwrap();
        assert!(!history.is_clean());
    }

    #[test]
    fn test_clean_marker_lost_on_eviction() {
        let mut history = History::with_max_depth(1);
        let a = group(&mut history, "a");
        history.commit(a);
        history.undo().unwrap();
        assert!(history.is_clean());
        history.redo().unwrap();
        let b = group(&mut history, "b");
        history.commit(b);
        history.undo().unwrap();
        assert!(!history.is_clean());
    }
}
