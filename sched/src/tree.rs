//! Task tree, relation store and assignment lists.
//!
//! Tasks and relations live in flat arenas indexed by [`TaskId`] and
//! [`RelationId`]. Removed entries leave a tombstone so ids are never reused
//! and stale ids are detected instead of aliasing a newer task.

use std::ops::ControlFlow;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{
    Assignment, NewTask, Relation, RelationId, RelationKind, ResourceId, Seconds, Task, TaskId,
    SECONDS_PER_DAY,
};

/// Structural errors raised by tree edits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("can't remove the root task")]
    RootRemoval,
    #[error("{0} is not part of this project")]
    UnknownTask(TaskId),
    #[error("{0} is not part of this project")]
    UnknownRelation(RelationId),
    #[error("{predecessor} is already a predecessor of {successor}")]
    RelationExists { predecessor: TaskId, successor: TaskId },
    #[error("{0} can't be its own predecessor")]
    SelfRelation(TaskId),
    #[error("the root task can't take part in a relation")]
    RootRelation,
    #[error("lag of {0}s is outside the supported range")]
    LagOutOfRange(Seconds),
    #[error("{resource} is already assigned to {task}")]
    AssignmentExists { task: TaskId, resource: ResourceId },
    #[error("{resource} is not assigned to {task}")]
    NotAssigned { task: TaskId, resource: ResourceId },
    #[error("can't move {task} beneath its own descendant {parent}")]
    MoveIntoSubtree { task: TaskId, parent: TaskId },
    #[error("{sibling} is not a child of {parent}")]
    NotASibling { sibling: TaskId, parent: TaskId },
}

/// Largest lag, either way, a relation may carry: about a century.
pub const MAX_LAG: Seconds = 100 * 366 * SECONDS_PER_DAY;

pub(crate) fn check_lag(lag: Seconds) -> Result<(), TreeError> {
    if !(-MAX_LAG..=MAX_LAG).contains(&lag) {
        return Err(TreeError::LagOutOfRange(lag));
    }
    Ok(())
}

/// Rooted task tree plus the relations between its tasks.
#[derive(Clone, Debug)]
pub struct TaskTree {
    tasks: Vec<Option<Task>>,
    relations: Vec<Option<Relation>>,
    root: TaskId,
    epoch: NaiveDateTime,
    live: usize,
}

impl TaskTree {
    /// Create a tree holding only the root container. Computed times of new
    /// tasks start out at `epoch`.
    pub fn new(epoch: NaiveDateTime) -> Self {
        let root = TaskId(0);
        let root_task = Task::from_new(root, NewTask::new("root"), epoch);
        Self {
            tasks: vec![Some(root_task)],
            relations: Vec::new(),
            root,
            epoch,
            live: 0,
        }
    }

    pub fn root(&self) -> TaskId {
        self.root
    }

    /// Number of live tasks, root excluded.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Size of the task arena including tombstones; every live `TaskId`
    /// indexes below this bound.
    pub fn capacity(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub(crate) fn task(&self, id: TaskId) -> Result<&Task, TreeError> {
        self.get(id).ok_or(TreeError::UnknownTask(id))
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, TreeError> {
        self.get_mut(id).ok_or(TreeError::UnknownTask(id))
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(id.index()).and_then(Option::as_ref)
    }

    /// All live relations.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().flatten()
    }

    /// Relations where `id` is the successor.
    pub fn predecessor_relations(&self, id: TaskId) -> impl Iterator<Item = &Relation> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|task| task.predecessors.iter())
            .filter_map(|rel| self.relation(*rel))
    }

    /// Relations where `id` is the predecessor.
    pub fn successor_relations(&self, id: TaskId) -> impl Iterator<Item = &Relation> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|task| task.successors.iter())
            .filter_map(|rel| self.relation(*rel))
    }

    pub fn find_relation(&self, predecessor: TaskId, successor: TaskId) -> Option<&Relation> {
        self.predecessor_relations(successor)
            .find(|rel| rel.predecessor == predecessor)
    }

    /// Parent of `id`, or `None` for the root and unknown tasks.
    pub fn parent(&self, id: TaskId) -> Option<TaskId> {
        self.get(id).and_then(|task| task.parent)
    }

    /// True if `ancestor` is `id` itself or lies on the path from `id` to the root.
    pub fn is_ancestor_or_self(&self, ancestor: TaskId, id: TaskId) -> bool {
        let mut current = Some(id);
        while let Some(task) = current {
            if task == ancestor {
                return true;
            }
            current = self.parent(task);
        }
        false
    }

    /// `from` followed by all of its descendants, in pre-order.
    pub fn pre_order(&self, from: TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(task) = self.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(task.children.iter().rev().copied());
        }
        out
    }

    /// All tasks in pre-order, the root excluded.
    pub fn all_tasks(&self) -> Vec<TaskId> {
        let mut order = self.pre_order(self.root);
        order.remove(0);
        order
    }

    /// Visit `from` and its subtree in pre-order until `visit` breaks.
    /// Returns `true` if the traversal was stopped early.
    pub fn traverse<F>(&self, from: TaskId, mut visit: F) -> bool
    where
        F: FnMut(&Task) -> ControlFlow<()>,
    {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(task) = self.get(id) else {
                continue;
            };
            if visit(task).is_break() {
                return true;
            }
            stack.extend(task.children.iter().rev().copied());
        }
        false
    }

    /// Insert a new task beneath `parent` (the root if `None`) at `position`
    /// among its siblings (appended if `None` or past the end).
    pub fn insert(
        &mut self,
        parent: Option<TaskId>,
        position: Option<usize>,
        new: NewTask,
    ) -> Result<TaskId, TreeError> {
        let parent = parent.unwrap_or(self.root);
        self.task(parent)?;

        let id = TaskId(self.tasks.len() as u32);
        let mut task = Task::from_new(id, new, self.epoch);
        task.parent = Some(parent);
        self.tasks.push(Some(task));
        self.live += 1;

        let siblings = &mut self.task_mut(parent)?.children;
        let at = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, id);
        Ok(id)
    }

    /// Remove `id` and its whole subtree, dropping every relation that
    /// touches a removed task. Returns the removed ids in pre-order.
    pub fn remove(&mut self, id: TaskId) -> Result<Vec<TaskId>, TreeError> {
        if id == self.root {
            return Err(TreeError::RootRemoval);
        }
        let parent = self.task(id)?.parent;

        let removed = self.pre_order(id);
        let mut doomed_relations: Vec<RelationId> = Vec::new();
        for task_id in &removed {
            if let Some(task) = self.get(*task_id) {
                doomed_relations.extend(task.predecessors.iter().copied());
                doomed_relations.extend(task.successors.iter().copied());
            }
        }
        doomed_relations.sort_unstable();
        doomed_relations.dedup();
        for rel in doomed_relations {
            // Already gone when both endpoints were in the subtree.
            let _ = self.remove_relation(rel);
        }

        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }
        for task_id in &removed {
            self.tasks[task_id.index()] = None;
        }
        self.live -= removed.len();
        Ok(removed)
    }

    /// Check that `task` may be re-parented beneath `parent`.
    pub fn check_reparent(&self, task: TaskId, parent: TaskId) -> Result<(), TreeError> {
        if task == self.root {
            return Err(TreeError::RootRemoval);
        }
        self.task(task)?;
        self.task(parent)?;
        if self.is_ancestor_or_self(task, parent) {
            return Err(TreeError::MoveIntoSubtree { task, parent });
        }
        Ok(())
    }

    /// Detach `task` from its parent and reattach it beneath `parent`, next to
    /// `sibling` (before or after it) or at the end when no sibling is given.
    pub fn move_task(
        &mut self,
        task: TaskId,
        parent: TaskId,
        sibling: Option<TaskId>,
        before: bool,
    ) -> Result<(), TreeError> {
        self.check_reparent(task, parent)?;
        if let Some(sibling) = sibling {
            if self.parent(sibling) != Some(parent) || sibling == task {
                return Err(TreeError::NotASibling { sibling, parent });
            }
        }

        let old_parent = self.task(task)?.parent;
        if let Some(old) = old_parent.and_then(|p| self.get_mut(p)) {
            old.children.retain(|child| *child != task);
        }

        let siblings = &mut self.task_mut(parent)?.children;
        let at = match sibling.and_then(|s| siblings.iter().position(|c| *c == s)) {
            Some(pos) if before => pos,
            Some(pos) => pos + 1,
            None => siblings.len(),
        };
        siblings.insert(at, task);
        self.task_mut(task)?.parent = Some(parent);
        Ok(())
    }

    /// Check that both ends of a proposed relation are distinct, live,
    /// non-root tasks.
    pub fn check_relation_ends(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<(), TreeError> {
        self.task(predecessor)?;
        self.task(successor)?;
        if predecessor == self.root || successor == self.root {
            return Err(TreeError::RootRelation);
        }
        if predecessor == successor {
            return Err(TreeError::SelfRelation(successor));
        }
        Ok(())
    }

    /// Record a relation on both endpoints. Does not check for cycles.
    pub fn add_relation(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        kind: RelationKind,
        lag: Seconds,
    ) -> Result<RelationId, TreeError> {
        self.check_relation_ends(predecessor, successor)?;
        check_lag(lag)?;
        if self.find_relation(predecessor, successor).is_some() {
            return Err(TreeError::RelationExists {
                predecessor,
                successor,
            });
        }

        let id = RelationId(self.relations.len() as u32);
        self.relations.push(Some(Relation {
            id,
            predecessor,
            successor,
            kind,
            lag,
        }));
        self.task_mut(predecessor)?.successors.push(id);
        self.task_mut(successor)?.predecessors.push(id);
        Ok(id)
    }

    pub fn remove_relation(&mut self, id: RelationId) -> Result<Relation, TreeError> {
        let relation = self
            .relations
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(TreeError::UnknownRelation(id))?;
        if let Some(pred) = self.get_mut(relation.predecessor) {
            pred.successors.retain(|r| *r != id);
        }
        if let Some(succ) = self.get_mut(relation.successor) {
            succ.predecessors.retain(|r| *r != id);
        }
        Ok(relation)
    }

    pub fn set_relation(
        &mut self,
        id: RelationId,
        kind: RelationKind,
        lag: Seconds,
    ) -> Result<(), TreeError> {
        check_lag(lag)?;
        let relation = self
            .relations
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownRelation(id))?;
        relation.kind = kind;
        relation.lag = lag;
        Ok(())
    }

    pub fn add_assignment(&mut self, task: TaskId, assignment: Assignment) -> Result<(), TreeError> {
        let entry = self.task_mut(task)?;
        if entry
            .assignments
            .iter()
            .any(|a| a.resource == assignment.resource)
        {
            return Err(TreeError::AssignmentExists {
                task,
                resource: assignment.resource,
            });
        }
        entry.assignments.push(assignment);
        Ok(())
    }

    pub fn remove_assignment(
        &mut self,
        task: TaskId,
        resource: ResourceId,
    ) -> Result<Assignment, TreeError> {
        let entry = self.task_mut(task)?;
        let pos = entry
            .assignments
            .iter()
            .position(|a| a.resource == resource)
            .ok_or(TreeError::NotAssigned { task, resource })?;
        Ok(entry.assignments.remove(pos))
    }

    pub fn set_assignment_units(
        &mut self,
        task: TaskId,
        resource: ResourceId,
        units: i32,
    ) -> Result<(), TreeError> {
        let entry = self.task_mut(task)?;
        let assignment = entry
            .assignments
            .iter_mut()
            .find(|a| a.resource == resource)
            .ok_or(TreeError::NotAssigned { task, resource })?;
        assignment.units = units;
        Ok(())
    }

    /// Initial computed time for tasks inserted from now on.
    pub(crate) fn set_epoch(&mut self, epoch: NaiveDateTime) {
        self.epoch = epoch;
    }
}
