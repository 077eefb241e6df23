//! Task manager: owns the tree, the calendars and the resources, and keeps
//! the computed schedule current as edits come in.

use std::borrow::Cow;
use std::ops::ControlFlow;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::calendar::Calendar;
use crate::config::SchedulingConfig;
use crate::events::{ChangeEvent, Invalidation};
use crate::graph::{self, topological_sort, CycleError, DependencyGraph, GraphError};
use crate::models::{
    Assignment, CalendarId, Constraint, NewTask, Relation, RelationId, RelationKind, Resource,
    ResourceId, SchedMode, Seconds, Task, TaskId, TaskType,
};
use crate::scheduler::{
    backward_pass, forward_pass, summary_duration, task_units_intervals, task_work,
    ScheduleContext, UnitsInterval,
};
use crate::tree::{self, TaskTree, TreeError};
use crate::{log_changes, log_checks, log_debug};

/// Errors returned by [`TaskManager`] operations. A failed operation leaves
/// the manager unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskManagerError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("{0} is not registered with this manager")]
    UnknownResource(ResourceId),
    #[error("{0} is not registered with this manager")]
    UnknownCalendar(CalendarId),
}

/// Where the manager is in a scheduling cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulePhase {
    #[default]
    Idle,
    Rebuilding,
    ForwardPass,
    BackwardPass,
}

/// Owner of a project's tasks and everything needed to schedule them.
///
/// Every mutation validates first and only then edits, so a rejected edit
/// leaves no trace. A successful edit raises `needs_rebuild` or
/// `needs_recalc` and, unless scheduling is blocked, runs one
/// rebuild/forward/backward cycle before returning.
#[derive(Debug)]
pub struct TaskManager {
    tree: TaskTree,
    graph: DependencyGraph,
    order: Vec<TaskId>,
    resources: Vec<Resource>,
    calendars: Vec<Box<dyn Calendar>>,
    project_calendar: CalendarId,
    project_start: NaiveDateTime,
    config: SchedulingConfig,

    needs_rebuild: bool,
    needs_recalc: bool,
    block_scheduling: bool,
    phase: SchedulePhase,
    events: Vec<ChangeEvent>,
}

fn schedule_context<'a>(
    resources: &'a [Resource],
    calendars: &'a [Box<dyn Calendar>],
    project_calendar: CalendarId,
    project_start: NaiveDateTime,
    config: &'a SchedulingConfig,
) -> ScheduleContext<'a> {
    ScheduleContext {
        resources,
        calendars,
        // Registered calendars are never removed and the project calendar id
        // is checked when set.
        project_calendar: &*calendars[project_calendar.index()],
        project_start,
        config,
    }
}

/// Log a structural rejection and lift it into a manager error.
fn usage<T>(result: Result<T, TreeError>) -> Result<T, TaskManagerError> {
    result.map_err(|err| {
        tracing::warn!(error = %err, "rejected task edit");
        err.into()
    })
}

impl TaskManager {
    /// Create an empty manager. `calendar` becomes the project calendar.
    pub fn new<C>(project_start: NaiveDateTime, calendar: C) -> Self
    where
        C: Calendar + 'static,
    {
        Self::with_config(project_start, calendar, SchedulingConfig::default())
    }

    pub fn with_config<C>(project_start: NaiveDateTime, calendar: C, config: SchedulingConfig) -> Self
    where
        C: Calendar + 'static,
    {
        Self {
            tree: TaskTree::new(project_start),
            graph: DependencyGraph::default(),
            order: Vec::new(),
            resources: Vec::new(),
            calendars: vec![Box::new(calendar)],
            project_calendar: CalendarId(0),
            project_start,
            config,
            needs_rebuild: true,
            needs_recalc: false,
            block_scheduling: false,
            phase: SchedulePhase::Idle,
            events: Vec::new(),
        }
    }

    fn context(&self) -> ScheduleContext<'_> {
        schedule_context(
            &self.resources,
            &self.calendars,
            self.project_calendar,
            self.project_start,
            &self.config,
        )
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn root(&self) -> TaskId {
        self.tree.root()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tree.get(id)
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.tree.relation(id)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn calendar(&self, id: CalendarId) -> Option<&dyn Calendar> {
        self.calendars.get(id.index()).map(|calendar| &**calendar)
    }

    pub fn project_calendar(&self) -> CalendarId {
        self.project_calendar
    }

    pub fn project_start(&self) -> NaiveDateTime {
        self.project_start
    }

    /// Every task in tree pre-order, root excluded.
    pub fn all_tasks(&self) -> Vec<TaskId> {
        self.tree.all_tasks()
    }

    /// Visit `from` and its subtree in pre-order until `visit` breaks.
    /// Returns `true` if the visitor stopped the traversal.
    pub fn traverse<F>(&self, from: TaskId, visit: F) -> Result<bool, TaskManagerError>
    where
        F: FnMut(&Task) -> ControlFlow<()>,
    {
        usage(self.tree.task(from))?;
        Ok(self.tree.traverse(from, visit))
    }

    /// Order the last recalculation scheduled tasks in, root excluded.
    pub fn dependency_order(&self) -> &[TaskId] {
        &self.order
    }

    /// Graph of the last rebuild. Stale while [`Self::needs_rebuild`] is set.
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    pub fn needs_recalc(&self) -> bool {
        self.needs_recalc
    }

    pub fn block_scheduling(&self) -> bool {
        self.block_scheduling
    }

    pub fn phase(&self) -> SchedulePhase {
        self.phase
    }

    /// Take the change notifications collected since the last call.
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resource effort of `task` between `start` (the task's own start if
    /// `None`) and `finish`. Always zero for the root.
    pub fn calculate_task_work(
        &self,
        task: TaskId,
        start: Option<NaiveDateTime>,
        finish: NaiveDateTime,
    ) -> Result<Seconds, TaskManagerError> {
        let entry = usage(self.tree.task(task))?;
        if task == self.tree.root() {
            return Ok(0);
        }
        let start = start.unwrap_or(entry.start);
        Ok(task_work(&self.context(), entry, start, finish))
    }

    /// Working time of the project calendar between `start` (the task's
    /// own start if `None`) and `finish`. Always zero for the root.
    pub fn calculate_summary_duration(
        &self,
        task: TaskId,
        start: Option<NaiveDateTime>,
        finish: NaiveDateTime,
    ) -> Result<Seconds, TaskManagerError> {
        let entry = usage(self.tree.task(task))?;
        if task == self.tree.root() {
            return Ok(0);
        }
        let start = start.unwrap_or(entry.start);
        let ctx = self.context();
        Ok(summary_duration(ctx.project_calendar, start, finish))
    }

    /// Capacity profile of `task` on `date`.
    pub fn units_intervals(
        &self,
        task: TaskId,
        date: NaiveDate,
    ) -> Result<Vec<UnitsInterval>, TaskManagerError> {
        let entry = usage(self.tree.task(task))?;
        Ok(task_units_intervals(&self.context(), entry, date))
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Graph to validate against: the cached one, or a fresh build while the
    /// cache is stale. Never replaces the cache.
    fn validation_graph(&self) -> Cow<'_, DependencyGraph> {
        if self.needs_rebuild {
            Cow::Owned(DependencyGraph::build(&self.tree))
        } else {
            Cow::Borrowed(&self.graph)
        }
    }

    /// Check that `predecessor` may become a predecessor of `task`.
    pub fn check_predecessor(
        &self,
        task: TaskId,
        predecessor: TaskId,
    ) -> Result<(), TaskManagerError> {
        usage(self.tree.check_relation_ends(predecessor, task))?;
        let current = self.validation_graph();
        graph::check_predecessor(&self.tree, &current, task, predecessor).map_err(|err| {
            log_changes!(self.config.verbosity, error = %err, "rejected relation");
            err.into()
        })
    }

    /// Check that `task` may be moved beneath `parent`.
    pub fn check_move(&self, task: TaskId, parent: TaskId) -> Result<(), TaskManagerError> {
        usage(self.tree.check_reparent(task, parent))?;
        graph::check_move(&self.tree, task, parent).map_err(|err| {
            log_changes!(self.config.verbosity, error = %err, "rejected move");
            err.into()
        })
    }

    // ------------------------------------------------------------------
    // Tree edits
    // ------------------------------------------------------------------

    /// Insert a task beneath `parent` (the root if `None`) at `position`
    /// among its siblings (appended if `None`).
    pub fn insert_task(
        &mut self,
        parent: Option<TaskId>,
        position: Option<usize>,
        new: NewTask,
    ) -> Result<TaskId, TaskManagerError> {
        let id = usage(self.tree.insert(parent, position, new))?;
        log_checks!(self.config.verbosity, task = %id, "inserted task");
        self.commit(Invalidation::Rebuild);
        Ok(id)
    }

    /// Remove `task` with its subtree and every relation touching it.
    /// Returns the removed ids in pre-order.
    pub fn remove_task(&mut self, task: TaskId) -> Result<Vec<TaskId>, TaskManagerError> {
        let removed = usage(self.tree.remove(task))?;
        log_checks!(self.config.verbosity, task = %task, count = removed.len(), "removed subtree");
        self.commit(Invalidation::Rebuild);
        Ok(removed)
    }

    /// Move `task` beneath `parent`, before or after `sibling` (appended
    /// when `None`). Rejected without any change if it would close a loop.
    pub fn move_task(
        &mut self,
        task: TaskId,
        parent: TaskId,
        sibling: Option<TaskId>,
        before: bool,
    ) -> Result<(), TaskManagerError> {
        self.check_move(task, parent)?;
        usage(self.tree.move_task(task, parent, sibling, before))?;
        log_checks!(self.config.verbosity, task = %task, parent = %parent, "moved task");
        self.commit(Invalidation::Rebuild);
        Ok(())
    }

    /// Replace the whole task tree. Every assignment must refer to a
    /// registered resource and the tree must not contain a dependency loop.
    pub fn set_root(&mut self, mut tree: TaskTree) -> Result<(), TaskManagerError> {
        for id in tree.all_tasks() {
            let Some(task) = tree.get(id) else {
                continue;
            };
            if let Some(assignment) = task
                .assignments
                .iter()
                .find(|a| a.resource.index() >= self.resources.len())
            {
                tracing::warn!(task = %id, resource = %assignment.resource, "rejected tree");
                return Err(TaskManagerError::UnknownResource(assignment.resource));
            }
        }

        let graph = DependencyGraph::build(&tree);
        let order = topological_sort(&graph).map_err(|err| {
            tracing::warn!(error = %err, "rejected tree");
            TaskManagerError::from(err)
        })?;

        tree.set_epoch(self.project_start);
        log_changes!(self.config.verbosity, tasks = tree.len(), "loaded task tree");
        self.tree = tree;
        self.graph = graph;
        self.order = order;
        self.needs_rebuild = false;
        self.commit(Invalidation::Recalc);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Make `predecessor` a predecessor of `successor`.
    pub fn add_relation(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        kind: RelationKind,
        lag: Seconds,
    ) -> Result<RelationId, TaskManagerError> {
        usage(self.tree.check_relation_ends(predecessor, successor))?;
        usage(tree::check_lag(lag))?;
        if self.tree.find_relation(predecessor, successor).is_some() {
            return usage(Err(TreeError::RelationExists {
                predecessor,
                successor,
            }));
        }
        self.check_predecessor(successor, predecessor)?;

        let id = usage(self.tree.add_relation(predecessor, successor, kind, lag))?;
        log_checks!(
            self.config.verbosity,
            relation = %id,
            predecessor = %predecessor,
            successor = %successor,
            ?kind,
            lag,
            "added relation"
        );
        self.commit(Invalidation::Rebuild);
        Ok(id)
    }

    pub fn remove_relation(&mut self, id: RelationId) -> Result<Relation, TaskManagerError> {
        let relation = usage(self.tree.remove_relation(id))?;
        self.commit(Invalidation::Rebuild);
        Ok(relation)
    }

    /// Change the kind and lag of a relation. The edge itself stays, so no
    /// rebuild is needed.
    pub fn set_relation(
        &mut self,
        id: RelationId,
        kind: RelationKind,
        lag: Seconds,
    ) -> Result<(), TaskManagerError> {
        usage(self.tree.set_relation(id, kind, lag))?;
        self.commit(Invalidation::Recalc);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Calendars and resources
    // ------------------------------------------------------------------

    pub fn add_calendar<C>(&mut self, calendar: C) -> CalendarId
    where
        C: Calendar + 'static,
    {
        let id = CalendarId(self.calendars.len() as u32);
        self.calendars.push(Box::new(calendar));
        id
    }

    /// Swap the working time of a registered calendar.
    pub fn replace_calendar<C>(&mut self, id: CalendarId, calendar: C) -> Result<(), TaskManagerError>
    where
        C: Calendar + 'static,
    {
        let slot = self
            .calendars
            .get_mut(id.index())
            .ok_or(TaskManagerError::UnknownCalendar(id))?;
        *slot = Box::new(calendar);
        self.commit(Invalidation::Recalc);
        Ok(())
    }

    pub fn set_project_calendar(&mut self, id: CalendarId) -> Result<(), TaskManagerError> {
        self.check_calendar(id)?;
        self.project_calendar = id;
        self.commit(Invalidation::Recalc);
        Ok(())
    }

    pub fn set_project_start(&mut self, start: NaiveDateTime) {
        self.project_start = start;
        self.tree.set_epoch(start);
        log_changes!(self.config.verbosity, %start, "project start changed");
        self.commit(Invalidation::Recalc);
    }

    fn check_calendar(&self, id: CalendarId) -> Result<(), TaskManagerError> {
        if id.index() >= self.calendars.len() {
            tracing::warn!(calendar = %id, "unknown calendar");
            return Err(TaskManagerError::UnknownCalendar(id));
        }
        Ok(())
    }

    fn check_resource(&self, id: ResourceId) -> Result<(), TaskManagerError> {
        if id.index() >= self.resources.len() {
            tracing::warn!(resource = %id, "unknown resource");
            return Err(TaskManagerError::UnknownResource(id));
        }
        Ok(())
    }

    /// Register a resource working on `calendar`, or on the project calendar
    /// if `None`.
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        calendar: Option<CalendarId>,
    ) -> Result<ResourceId, TaskManagerError> {
        if let Some(calendar) = calendar {
            self.check_calendar(calendar)?;
        }
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(Resource {
            id,
            name: name.into(),
            calendar,
        });
        Ok(id)
    }

    pub fn set_resource_calendar(
        &mut self,
        id: ResourceId,
        calendar: Option<CalendarId>,
    ) -> Result<(), TaskManagerError> {
        self.check_resource(id)?;
        if let Some(calendar) = calendar {
            self.check_calendar(calendar)?;
        }
        if let Some(resource) = self.resources.get_mut(id.index()) {
            resource.calendar = calendar;
        }
        self.commit(Invalidation::Recalc);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    pub fn add_assignment(
        &mut self,
        task: TaskId,
        resource: ResourceId,
        units: i32,
    ) -> Result<(), TaskManagerError> {
        self.check_resource(resource)?;
        usage(self.tree.add_assignment(task, Assignment { resource, units }))?;
        self.commit(Invalidation::Rebuild);
        Ok(())
    }

    pub fn remove_assignment(
        &mut self,
        task: TaskId,
        resource: ResourceId,
    ) -> Result<Assignment, TaskManagerError> {
        let assignment = usage(self.tree.remove_assignment(task, resource))?;
        self.commit(Invalidation::Rebuild);
        Ok(assignment)
    }

    pub fn set_assignment_units(
        &mut self,
        task: TaskId,
        resource: ResourceId,
        units: i32,
    ) -> Result<(), TaskManagerError> {
        usage(self.tree.set_assignment_units(task, resource, units))?;
        self.commit(Invalidation::Recalc);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Task properties
    // ------------------------------------------------------------------

    fn update<F>(&mut self, id: TaskId, invalidation: Invalidation, apply: F) -> Result<(), TaskManagerError>
    where
        F: FnOnce(&mut Task),
    {
        apply(usage(self.tree.task_mut(id))?);
        self.commit(invalidation);
        Ok(())
    }

    pub fn set_name(&mut self, id: TaskId, name: impl Into<String>) -> Result<(), TaskManagerError> {
        let name = name.into();
        self.update(id, Invalidation::None, |task| task.name = name)
    }

    pub fn set_work(&mut self, id: TaskId, work: Seconds) -> Result<(), TaskManagerError> {
        self.update(id, Invalidation::Recalc, |task| task.work = work)
    }

    pub fn set_duration(&mut self, id: TaskId, duration: Seconds) -> Result<(), TaskManagerError> {
        self.update(id, Invalidation::Recalc, |task| task.duration = duration)
    }

    pub fn set_constraint(
        &mut self,
        id: TaskId,
        constraint: Constraint,
    ) -> Result<(), TaskManagerError> {
        self.update(id, Invalidation::Recalc, |task| task.constraint = constraint)
    }

    pub fn set_task_type(&mut self, id: TaskId, task_type: TaskType) -> Result<(), TaskManagerError> {
        self.update(id, Invalidation::Recalc, |task| task.task_type = task_type)
    }

    pub fn set_sched(&mut self, id: TaskId, sched: SchedMode) -> Result<(), TaskManagerError> {
        self.update(id, Invalidation::Recalc, |task| task.sched = sched)
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Suspend or resume scheduling. Resuming runs one recalculation covering
    /// everything edited while blocked.
    pub fn set_block_scheduling(&mut self, block: bool) {
        if self.block_scheduling == block {
            return;
        }
        self.block_scheduling = block;
        log_changes!(self.config.verbosity, block, "block scheduling");
        if !block {
            self.recalc(true);
        }
    }

    fn commit(&mut self, invalidation: Invalidation) {
        match invalidation {
            Invalidation::None => return,
            Invalidation::Recalc => self.needs_recalc = true,
            Invalidation::Rebuild => self.needs_rebuild = true,
        }
        self.recalc(false);
    }

    /// Rebuild the dependency graph and order now, unless scheduling is
    /// blocked.
    pub fn rebuild(&mut self) {
        if self.block_scheduling || self.phase != SchedulePhase::Idle {
            return;
        }
        self.rebuild_graph();
        self.phase = SchedulePhase::Idle;
    }

    fn rebuild_graph(&mut self) {
        self.phase = SchedulePhase::Rebuilding;
        let graph = DependencyGraph::build(&self.tree);
        let order = match topological_sort(&graph) {
            Ok(order) => order,
            // Every edit that adds an edge is checked for loops first.
            Err(err) => panic!("dependency graph of an accepted tree has a loop: {err}"),
        };
        assert_eq!(
            order.len(),
            self.tree.len(),
            "dependency order must cover every task"
        );
        log_changes!(
            self.config.verbosity,
            tasks = order.len(),
            edges = graph.edge_count(),
            "rebuilt dependency graph"
        );
        log_debug!(self.config.verbosity, ?order, "dependency order");

        self.graph = graph;
        self.order = order;
        self.needs_rebuild = false;
        self.needs_recalc = true;
    }

    /// Bring the schedule up to date. `force` recalculates even if nothing
    /// was invalidated. Does nothing while scheduling is blocked, and is
    /// postponed while the project has no tasks.
    pub fn recalc(&mut self, force: bool) {
        self.needs_recalc |= force;
        if self.block_scheduling || self.phase != SchedulePhase::Idle {
            return;
        }
        if !self.needs_recalc && !self.needs_rebuild {
            return;
        }
        if self.tree.is_empty() {
            log_debug!(self.config.verbosity, "recalc postponed, no tasks");
            return;
        }

        if self.needs_rebuild {
            self.rebuild_graph();
        }

        let first_event = self.events.len();
        let ctx = schedule_context(
            &self.resources,
            &self.calendars,
            self.project_calendar,
            self.project_start,
            &self.config,
        );

        self.phase = SchedulePhase::ForwardPass;
        forward_pass(&ctx, &mut self.tree, &self.graph, &self.order, &mut self.events);

        self.phase = SchedulePhase::BackwardPass;
        backward_pass(&mut self.tree, &self.order, ctx.verbosity(), &mut self.events);

        self.phase = SchedulePhase::Idle;
        self.needs_recalc = false;
        log_changes!(
            self.config.verbosity,
            tasks = self.order.len(),
            changes = self.events.len() - first_event,
            "recalculated schedule"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{WorkCalendar, WorkInterval};
    use crate::events::TaskField;
    use crate::scheduler::test_support::{at, day, H};
    use crate::tree::MAX_LAG;
    use chrono::{Duration, Weekday};

    const WEEKDAYS: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    fn eight_hour_days() -> WorkCalendar {
        WorkCalendar::custom(WEEKDAYS, [WorkInterval::hours(8, 16).unwrap()]).unwrap()
    }

    fn manager() -> TaskManager {
        TaskManager::new(at(0, 8, 0), eight_hour_days())
    }

    fn chain(manager: &mut TaskManager) -> (TaskId, TaskId) {
        let a = manager
            .insert_task(None, None, NewTask::new("a").with_work(8 * H))
            .unwrap();
        let b = manager
            .insert_task(None, None, NewTask::new("b").with_work(8 * H))
            .unwrap();
        manager
            .add_relation(a, b, RelationKind::FinishToStart, 0)
            .unwrap();
        (a, b)
    }

    #[test]
    fn test_finish_to_start_pair() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);

        let task_a = manager.task(a).unwrap();
        let task_b = manager.task(b).unwrap();
        assert_eq!(task_a.start(), at(0, 8, 0));
        assert_eq!(task_a.finish(), at(0, 16, 0));
        assert_eq!(task_b.start(), task_a.finish());
        assert_eq!(task_b.work_start(), at(1, 8, 0));
        assert_eq!(task_b.finish(), at(1, 16, 0));
        assert!(task_a.is_critical());
        assert!(task_b.is_critical());

        let root = manager.task(manager.root()).unwrap();
        assert_eq!(root.start(), task_a.start());
        assert_eq!(root.finish(), task_b.finish());
        assert_eq!(manager.dependency_order(), &[a, b]);
        assert_eq!(manager.phase(), SchedulePhase::Idle);
    }

    #[test]
    fn test_events_drained_once() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);

        let events = manager.drain_events();
        assert!(events.contains(&ChangeEvent::new(a, TaskField::Critical)));
        assert!(events.contains(&ChangeEvent::new(b, TaskField::Finish)));
        assert!(manager.drain_events().is_empty());

        manager.recalc(true);
        assert!(manager.drain_events().is_empty());
    }

    #[test]
    fn test_long_holiday_terminates() {
        let mut calendar = WorkCalendar::standard();
        calendar.add_holiday_range(day(0), day(0) + Duration::days(149));
        let mut manager = TaskManager::new(at(0, 8, 0), calendar);
        let a = manager
            .insert_task(None, None, NewTask::new("a").with_work(8 * H))
            .unwrap();

        let task = manager.task(a).unwrap();
        assert!(task.finish() > task.start());
        assert!(task.finish() <= at(0, 8, 0) + Duration::days(102));
    }

    #[test]
    fn test_move_under_dependent_rejected() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);
        let root = manager.root();

        assert_eq!(
            manager.move_task(a, b, None, false),
            Err(TaskManagerError::Cycle(CycleError::MoveLoop { task: a, parent: b }))
        );
        assert_eq!(manager.task(root).unwrap().children(), &[a, b]);
        assert!(manager.task(b).unwrap().children().is_empty());
        assert_eq!(manager.task(a).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_move_into_summary() {
        let mut manager = manager();
        let summary = manager
            .insert_task(None, None, NewTask::new("summary"))
            .unwrap();
        let a = manager
            .insert_task(None, None, NewTask::new("a").with_work(4 * H))
            .unwrap();

        manager.move_task(a, summary, None, false).unwrap();
        let summary = manager.task(summary).unwrap();
        assert_eq!(summary.children(), &[a]);
        assert_eq!(summary.finish(), at(0, 12, 0));
    }

    #[test]
    fn test_relation_loop_leaves_graph_unchanged() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);
        let before = manager.dependency_graph().clone();

        assert_eq!(
            manager.add_relation(b, a, RelationKind::FinishToStart, 0),
            Err(TaskManagerError::Cycle(CycleError::PredecessorLoop {
                task: a,
                predecessor: b
            }))
        );
        assert_eq!(manager.dependency_graph(), &before);
        assert_eq!(manager.tree().relations().count(), 1);
        assert!(!manager.needs_rebuild());
    }

    #[test]
    fn test_duplicate_and_self_relation_rejected() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);
        assert_eq!(
            manager.add_relation(a, b, RelationKind::StartToStart, 0),
            Err(TaskManagerError::Tree(TreeError::RelationExists {
                predecessor: a,
                successor: b
            }))
        );
        assert_eq!(
            manager.add_relation(a, a, RelationKind::FinishToStart, 0),
            Err(TaskManagerError::Tree(TreeError::SelfRelation(a)))
        );
    }

    #[test]
    fn test_root_relation_rejected() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);
        let root = manager.root();
        let root_relation = Err(TaskManagerError::Tree(TreeError::RootRelation));

        assert_eq!(
            manager.add_relation(root, a, RelationKind::FinishToStart, 0),
            root_relation
        );
        assert_eq!(
            manager.add_relation(b, root, RelationKind::FinishToStart, 0),
            root_relation
        );
        assert_eq!(
            manager.check_predecessor(a, root),
            Err(TaskManagerError::Tree(TreeError::RootRelation))
        );
        assert_eq!(manager.tree().relations().count(), 1);
        assert!(!manager.needs_rebuild());

        manager.set_work(a, 16 * H).unwrap();
        assert_eq!(manager.task(b).unwrap().finish(), at(2, 16, 0));
        assert_eq!(manager.task(root).unwrap().finish(), at(2, 16, 0));
    }

    #[test]
    fn test_extreme_lag_rejected() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);
        let c = manager
            .insert_task(None, None, NewTask::new("c").with_work(H))
            .unwrap();

        assert_eq!(
            manager.add_relation(b, c, RelationKind::FinishToStart, Seconds::MAX),
            Err(TaskManagerError::Tree(TreeError::LagOutOfRange(Seconds::MAX)))
        );
        let relation = manager.tree().find_relation(a, b).unwrap().id();
        assert_eq!(
            manager.set_relation(relation, RelationKind::StartToStart, Seconds::MIN),
            Err(TaskManagerError::Tree(TreeError::LagOutOfRange(Seconds::MIN)))
        );
        assert_eq!(manager.task(b).unwrap().finish(), at(1, 16, 0));

        // A century of lag on a far-off successor still schedules.
        manager
            .add_relation(b, c, RelationKind::FinishToStart, MAX_LAG)
            .unwrap();
        assert!(manager.task(c).unwrap().start() > at(1, 16, 0) + Duration::days(36_000));
    }

    #[test]
    fn test_structural_errors() {
        let mut manager = manager();
        let root = manager.root();
        assert_eq!(
            manager.remove_task(root),
            Err(TaskManagerError::Tree(TreeError::RootRemoval))
        );
        assert_eq!(
            manager.set_work(TaskId(42), H),
            Err(TaskManagerError::Tree(TreeError::UnknownTask(TaskId(42))))
        );
        assert_eq!(
            manager.add_resource("x", Some(CalendarId(7))),
            Err(TaskManagerError::UnknownCalendar(CalendarId(7)))
        );
    }

    #[test]
    fn test_block_scheduling_consolidates() {
        let mut manager = manager();
        manager.set_block_scheduling(true);
        let (_, b) = chain(&mut manager);

        assert!(manager.needs_rebuild());
        assert_eq!(manager.task(b).unwrap().finish(), at(0, 8, 0));
        assert!(manager.drain_events().is_empty());

        manager.set_block_scheduling(false);
        assert!(!manager.needs_rebuild());
        assert!(!manager.needs_recalc());
        assert_eq!(manager.task(b).unwrap().finish(), at(1, 16, 0));
    }

    #[test]
    fn test_recalc_postponed_without_tasks() {
        let mut manager = manager();
        manager.recalc(true);
        assert!(manager.needs_rebuild());
        assert!(manager.needs_recalc());

        let a = manager
            .insert_task(None, None, NewTask::new("a").with_work(2 * H))
            .unwrap();
        assert!(!manager.needs_recalc());
        assert_eq!(manager.task(a).unwrap().finish(), at(0, 10, 0));
    }

    #[test]
    fn test_remove_predecessor_reschedules() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);

        assert_eq!(manager.remove_task(a), Ok(vec![a]));
        assert_eq!(manager.tree().relations().count(), 0);
        assert_eq!(manager.task(b).unwrap().start(), at(0, 8, 0));
        assert_eq!(manager.task(manager.root()).unwrap().finish(), at(0, 16, 0));
        assert_eq!(manager.dependency_order(), &[b]);
    }

    #[test]
    fn test_fixed_duration_units() {
        let mut manager = manager();
        let ann = manager.add_resource("ann", None).unwrap();
        let a = manager
            .insert_task(
                None,
                None,
                NewTask::new("a").with_work(4 * H).with_fixed_duration(8 * H),
            )
            .unwrap();
        manager.add_assignment(a, ann, 100).unwrap();

        let task = manager.task(a).unwrap();
        assert_eq!(task.finish(), at(0, 16, 0));
        assert_eq!(task.assignments()[0].units, 50);
    }

    #[test]
    fn test_resource_calendar() {
        let mut manager = manager();
        let short =
            WorkCalendar::custom(WEEKDAYS, [WorkInterval::hours(10, 14).unwrap()]).unwrap();
        let short = manager.add_calendar(short);
        let bob = manager.add_resource("bob", Some(short)).unwrap();
        let a = manager
            .insert_task(None, None, NewTask::new("a").with_work(8 * H))
            .unwrap();
        manager.add_assignment(a, bob, 100).unwrap();

        let task = manager.task(a).unwrap();
        assert_eq!(task.work_start(), at(0, 10, 0));
        assert_eq!(task.finish(), at(1, 14, 0));

        manager.set_resource_calendar(bob, None).unwrap();
        assert_eq!(manager.task(a).unwrap().finish(), at(0, 16, 0));
    }

    #[test]
    fn test_property_setters() {
        let mut manager = manager();
        let (a, b) = chain(&mut manager);
        manager.drain_events();

        manager.set_name(a, "renamed").unwrap();
        assert_eq!(manager.task(a).unwrap().name(), "renamed");
        assert!(manager.drain_events().is_empty());

        manager.set_work(a, 4 * H).unwrap();
        assert_eq!(manager.task(b).unwrap().start(), at(0, 12, 0));

        manager
            .set_constraint(b, Constraint::MustStartOn(at(2, 8, 0)))
            .unwrap();
        assert_eq!(manager.task(b).unwrap().start(), at(2, 8, 0));

        manager.set_task_type(a, TaskType::Milestone).unwrap();
        let a = manager.task(a).unwrap();
        assert_eq!(a.start(), a.finish());
    }

    #[test]
    fn test_project_start_moves_tasks() {
        let mut manager = manager();
        let (a, _) = chain(&mut manager);
        manager.drain_events();

        manager.set_project_start(at(1, 8, 0));
        assert_eq!(manager.task(a).unwrap().start(), at(1, 8, 0));
        assert!(manager
            .drain_events()
            .contains(&ChangeEvent::new(a, TaskField::Start)));
    }

    #[test]
    fn test_set_root() {
        let mut manager = manager();
        let mut tree = TaskTree::new(at(0, 0, 0));
        let a = tree.insert(None, None, NewTask::new("a").with_work(8 * H)).unwrap();
        let b = tree.insert(None, None, NewTask::new("b").with_work(8 * H)).unwrap();
        tree.add_relation(a, b, RelationKind::FinishToStart, 0).unwrap();

        let mut looped = tree.clone();
        looped.add_relation(b, a, RelationKind::FinishToStart, 0).unwrap();
        assert!(matches!(
            manager.set_root(looped),
            Err(TaskManagerError::Graph(GraphError::Unsorted { .. }))
        ));
        assert!(manager.all_tasks().is_empty());

        let mut unknown = tree.clone();
        unknown
            .add_assignment(a, Assignment { resource: ResourceId(3), units: 100 })
            .unwrap();
        assert_eq!(
            manager.set_root(unknown),
            Err(TaskManagerError::UnknownResource(ResourceId(3)))
        );

        manager.set_root(tree).unwrap();
        assert_eq!(manager.all_tasks(), vec![a, b]);
        assert_eq!(manager.task(b).unwrap().finish(), at(1, 16, 0));
    }

    #[test]
    fn test_work_and_duration_queries() {
        let mut manager = manager();
        let summary = manager
            .insert_task(None, None, NewTask::new("summary"))
            .unwrap();
        let a = manager
            .insert_task(Some(summary), None, NewTask::new("a").with_work(8 * H))
            .unwrap();
        let root = manager.root();

        let finish = manager.task(a).unwrap().finish();
        assert_eq!(manager.calculate_task_work(a, None, finish), Ok(8 * H));
        assert_eq!(
            manager.calculate_task_work(a, Some(at(0, 12, 0)), finish),
            Ok(4 * H)
        );
        assert_eq!(manager.calculate_task_work(root, None, finish), Ok(0));
        assert_eq!(
            manager.calculate_summary_duration(summary, None, at(1, 16, 0)),
            Ok(16 * H)
        );
        assert_eq!(manager.calculate_summary_duration(root, None, finish), Ok(0));

        let intervals = manager.units_intervals(a, day(0)).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].units, 100);
    }

    #[test]
    fn test_traverse_and_listing() {
        let mut manager = manager();
        let summary = manager
            .insert_task(None, None, NewTask::new("summary"))
            .unwrap();
        let a = manager
            .insert_task(Some(summary), None, NewTask::new("a"))
            .unwrap();
        let b = manager.insert_task(None, Some(0), NewTask::new("b")).unwrap();
        assert_eq!(manager.all_tasks(), vec![b, summary, a]);

        let mut seen = Vec::new();
        let stopped = manager
            .traverse(summary, |task| {
                seen.push(task.id());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert!(!stopped);
        assert_eq!(seen, vec![summary, a]);
        assert!(manager
            .traverse(TaskId(99), |_| ControlFlow::Break(()))
            .is_err());
    }
}
