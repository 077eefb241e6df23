//! Topological ordering of the dependency graph.

use std::collections::VecDeque;

use thiserror::Error;

use super::DependencyGraph;
use crate::models::TaskId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Some tasks never reached in-degree zero, so the edge set has a cycle.
    #[error("dependency graph has a cycle: only {visited} of {total} tasks could be ordered")]
    Unsorted { visited: usize, total: usize },
}

/// Order tasks with Kahn's algorithm so that every task comes after all of
/// the tasks it depends on.
///
/// Tasks without dependencies are seeded in tree pre-order, which keeps the
/// result deterministic for a given tree.
pub fn topological_sort(graph: &DependencyGraph) -> Result<Vec<TaskId>, GraphError> {
    let tasks = graph.tasks();
    let slots = tasks.iter().map(|t| t.index() + 1).max().unwrap_or(0);

    let mut in_degree = vec![0usize; slots];
    for task in tasks {
        in_degree[task.index()] = graph.prev(*task).len();
    }

    let mut queue: VecDeque<TaskId> = tasks
        .iter()
        .copied()
        .filter(|task| in_degree[task.index()] == 0)
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(task) = queue.pop_front() {
        order.push(task);

        for next in graph.next(task) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(*next);
            }
        }
    }

    if order.len() != tasks.len() {
        return Err(GraphError::Unsorted {
            visited: order.len(),
            total: tasks.len(),
        });
    }

    Ok(order)
}
