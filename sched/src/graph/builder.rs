//! Builds the scheduling DAG from the task tree and its relations.

use rustc_hash::FxHashSet;

use crate::models::{RelationId, TaskId};
use crate::tree::TaskTree;

/// Adjacency of every live task, root excluded.
///
/// An edge `a -> b` means `a` must be scheduled before `b`. Edges come from
/// three sources:
/// - relation predecessor -> successor,
/// - child -> parent (summaries aggregate their children),
/// - ancestor predecessor -> descendant (a relation on a summary binds every
///   task beneath it).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    prev: Vec<Vec<TaskId>>,
    next: Vec<Vec<TaskId>>,
    /// Relations binding each task, tagged with the task or ancestor that
    /// holds them.
    binding: Vec<Vec<(TaskId, RelationId)>>,
    tasks: Vec<TaskId>,
    edges: usize,
}

impl DependencyGraph {
    /// Build the graph for the tree as it currently is.
    pub fn build(tree: &TaskTree) -> Self {
        Self::build_with(tree, |id| tree.parent(id))
    }

    /// Build the graph with `parent_of` standing in for the tree's parent
    /// links. Used to evaluate a move without touching the tree.
    pub fn build_with<F>(tree: &TaskTree, parent_of: F) -> Self
    where
        F: Fn(TaskId) -> Option<TaskId>,
    {
        let slots = tree.capacity();
        let root = tree.root();
        let mut graph = Self {
            prev: vec![Vec::new(); slots],
            next: vec![Vec::new(); slots],
            binding: vec![Vec::new(); slots],
            tasks: tree.all_tasks(),
            edges: 0,
        };
        let mut seen: FxHashSet<(TaskId, TaskId)> = FxHashSet::default();

        for index in 0..graph.tasks.len() {
            let task = graph.tasks[index];

            if let Some(parent) = parent_of(task).filter(|p| *p != root) {
                graph.add_edge(&mut seen, task, parent);
            }

            // Walk up through the ancestors, collecting every relation that
            // binds this task.
            let mut holder = Some(task);
            let mut depth = 0;
            while let Some(current) = holder.filter(|h| *h != root) {
                for relation in tree.predecessor_relations(current) {
                    graph.binding[task.index()].push((current, relation.id()));
                    graph.add_edge(&mut seen, relation.predecessor(), task);
                }
                holder = parent_of(current);
                depth += 1;
                if depth > slots {
                    // parent_of produced a loop; move validation rejects that
                    // before a graph is ever built from it.
                    break;
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, seen: &mut FxHashSet<(TaskId, TaskId)>, from: TaskId, to: TaskId) {
        if !seen.insert((from, to)) {
            return;
        }
        self.next[from.index()].push(to);
        self.prev[to.index()].push(from);
        self.edges += 1;
    }

    /// Tasks that must be scheduled before `id`.
    pub fn prev(&self, id: TaskId) -> &[TaskId] {
        self.prev.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Tasks that must be scheduled after `id`.
    pub fn next(&self, id: TaskId) -> &[TaskId] {
        self.next.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Every relation that constrains `id`'s start, from the task itself
    /// upwards through its ancestors. Each entry carries the task holding the
    /// relation.
    pub fn binding_relations(&self, id: TaskId) -> &[(TaskId, RelationId)] {
        self.binding.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Live tasks in tree pre-order.
    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// All edges, sorted. Two graphs with equal edge lists schedule identically.
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        let mut out: Vec<(TaskId, TaskId)> = self
            .tasks
            .iter()
            .flat_map(|from| self.next(*from).iter().map(move |to| (*from, *to)))
            .collect();
        out.sort_unstable();
        out
    }
}
