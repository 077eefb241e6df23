//! Cycle checks for proposed relations and moves.
//!
//! Both checks are read-only: a proposed predecessor is layered over the
//! existing graph as extra edges, and a proposed move is evaluated on a
//! scratch graph built with the new parent. Each search owns its visited set.

use rustc_hash::FxHashSet;
use thiserror::Error;

use super::DependencyGraph;
use crate::models::TaskId;
use crate::tree::TaskTree;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("can't add {predecessor} as a predecessor of {task}, because it would result in a loop")]
    PredecessorLoop { task: TaskId, predecessor: TaskId },
    #[error("can't move {task} beneath {parent}, because it would result in a loop")]
    MoveLoop { task: TaskId, parent: TaskId },
}

/// Check that making `predecessor` a predecessor of `task` keeps `graph`
/// acyclic. `graph` must be current for `tree`.
pub fn check_predecessor(
    tree: &TaskTree,
    graph: &DependencyGraph,
    task: TaskId,
    predecessor: TaskId,
) -> Result<(), CycleError> {
    // The new relation binds the task and everything beneath it.
    let extra: Vec<(TaskId, TaskId)> = tree
        .pre_order(task)
        .into_iter()
        .map(|bound| (predecessor, bound))
        .collect();

    if loops_back(graph, predecessor, &extra) {
        return Err(CycleError::PredecessorLoop { task, predecessor });
    }
    Ok(())
}

/// Check that re-parenting `task` beneath `parent` keeps the graph acyclic.
///
/// Every task of the moved subtree is checked on its own, since a child's
/// relations can close a loop through the new parent even when the moved
/// task's own relations don't.
pub fn check_move(tree: &TaskTree, task: TaskId, parent: TaskId) -> Result<(), CycleError> {
    let scratch = DependencyGraph::build_with(tree, |id| {
        if id == task {
            Some(parent)
        } else {
            tree.parent(id)
        }
    });

    for origin in tree.pre_order(task) {
        if loops_back(&scratch, origin, &[]) {
            return Err(CycleError::MoveLoop { task, parent });
        }
    }
    Ok(())
}

/// True if `origin` can reach itself along at least one edge of `graph`
/// plus `extra`.
fn loops_back(graph: &DependencyGraph, origin: TaskId, extra: &[(TaskId, TaskId)]) -> bool {
    let successors = |id: TaskId| {
        graph.next(id).iter().copied().chain(
            extra
                .iter()
                .filter(move |(from, _)| *from == id)
                .map(|(_, to)| *to),
        )
    };

    let mut visited: FxHashSet<TaskId> = FxHashSet::default();
    visited.insert(origin);
    let mut stack: Vec<TaskId> = successors(origin).collect();

    while let Some(id) = stack.pop() {
        if id == origin {
            return true;
        }
        if visited.insert(id) {
            stack.extend(successors(id));
        }
    }
    false
}
