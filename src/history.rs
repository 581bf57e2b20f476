use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::surface::{DrawingSurface, Snapshot};

/// Undo/redo stacks of full-surface snapshots.
///
/// Unbounded by default. With a limit set, a push past the limit drops the
/// oldest entry of that stack.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    limit: Option<NonZeroUsize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<NonZeroUsize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.limit
    }

    /// Records the surface as it is before a stroke starts painting.
    pub fn capture_for_undo(&mut self, surface: &DrawingSurface) {
        self.commit(surface.read_all());
    }

    /// Records the surface right before it is cleared.
    pub fn capture_for_clear(&mut self, surface: &DrawingSurface) {
        self.commit(surface.read_all());
    }

    fn commit(&mut self, snapshot: Snapshot) {
        push_bounded(&mut self.undo_stack, snapshot, self.limit);
        if !self.redo_stack.is_empty() {
            tracing::debug!(dropped = self.redo_stack.len(), "redo history invalidated");
            self.redo_stack.clear();
        }
    }

    pub fn undo(&mut self, surface: &mut DrawingSurface) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        push_bounded(&mut self.redo_stack, surface.read_all(), self.limit);
        surface.write_all(&snapshot);
        tracing::debug!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "undo"
        );
        true
    }

    pub fn redo(&mut self, surface: &mut DrawingSurface) -> bool {
        let Some(snapshot) = self.redo_stack.pop_back() else {
            return false;
        };
        push_bounded(&mut self.undo_stack, surface.read_all(), self.limit);
        surface.write_all(&snapshot);
        tracing::debug!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "redo"
        );
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, limit: Option<NonZeroUsize>) {
    stack.push_back(snapshot);
    if let Some(limit) = limit {
        while stack.len() > limit.get() {
            stack.pop_front();
        }
    }
}
