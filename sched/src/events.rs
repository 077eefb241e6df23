//! Change notifications and invalidation tokens.

use crate::models::TaskId;

/// Computed task field that changed during a recalculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskField {
    Start,
    Finish,
    Duration,
    Critical,
}

/// A computed field of `task` differs from its value before the pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub task: TaskId,
    pub field: TaskField,
}

impl ChangeEvent {
    pub fn new(task: TaskId, field: TaskField) -> Self {
        Self { task, field }
    }
}

/// What an edit invalidated, weakest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Invalidation {
    /// Nothing computed depends on the edit (e.g. a rename).
    #[default]
    None,
    /// Times must be recomputed over the existing dependency order.
    Recalc,
    /// The dependency graph itself changed.
    Rebuild,
}
