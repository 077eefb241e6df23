//! Core data types for the scheduling core.
//!
//! Tasks, relations and assignments live in flat arenas owned by
//! [`TaskTree`](crate::tree::TaskTree) and refer to each other by index.

use std::fmt;

use chrono::NaiveDateTime;

/// Amounts of work, duration and lag, in seconds.
pub type Seconds = i64;

pub const SECONDS_PER_HOUR: Seconds = 60 * 60;
pub const SECONDS_PER_DAY: Seconds = 24 * SECONDS_PER_HOUR;

/// Index of a task in the task arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u32);

/// Index of a relation in the relation arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub(crate) u32);

/// Index of a resource registered with the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

/// Index of a calendar registered with the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarId(pub(crate) u32);

impl TaskId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl RelationId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl ResourceId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl CalendarId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relation#{}", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "calendar#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskType {
    #[default]
    Normal,
    Milestone,
}

/// Which quantity is held constant when resource availability changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedMode {
    /// Total effort is fixed; the duration follows from capacity.
    #[default]
    FixedWork,
    /// Elapsed working time is fixed; assignment units follow from work.
    FixedDuration,
}

/// Scheduling constraint on a task's start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Constraint {
    #[default]
    AsSoonAsPossible,
    StartNoEarlierThan(NaiveDateTime),
    MustStartOn(NaiveDateTime),
    /// Accepted but not scheduled yet; behaves as ASAP.
    AsLateAsPossible,
    /// Accepted but not scheduled yet; behaves as ASAP.
    FinishNoLaterThan(NaiveDateTime),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RelationKind {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

/// A directed dependency edge between two tasks.
///
/// Stored once in the relation arena; both endpoints reference it by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub(crate) id: RelationId,
    pub(crate) predecessor: TaskId,
    pub(crate) successor: TaskId,
    pub(crate) kind: RelationKind,
    pub(crate) lag: Seconds,
}

impl Relation {
    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn predecessor(&self) -> TaskId {
        self.predecessor
    }

    pub fn successor(&self) -> TaskId {
        self.successor
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn lag(&self) -> Seconds {
        self.lag
    }
}

/// A resource working on a task at a percentage of its capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub resource: ResourceId,
    /// Percentage of the resource's calendar time, 100 = full time.
    pub units: i32,
}

/// A person or piece of equipment that can be assigned to tasks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    /// `None` means "use the project calendar".
    pub(crate) calendar: Option<CalendarId>,
}

impl Resource {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calendar(&self) -> Option<CalendarId> {
        self.calendar
    }
}

/// Description of a task to insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub task_type: TaskType,
    pub sched: SchedMode,
    pub constraint: Constraint,
    pub work: Seconds,
    pub duration: Seconds,
}

impl NewTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: TaskType::Normal,
            sched: SchedMode::FixedWork,
            constraint: Constraint::AsSoonAsPossible,
            work: 0,
            duration: 0,
        }
    }

    pub fn milestone(name: impl Into<String>) -> Self {
        Self {
            task_type: TaskType::Milestone,
            ..Self::new(name)
        }
    }

    pub fn with_work(mut self, work: Seconds) -> Self {
        self.work = work;
        self
    }

    /// Switches to fixed-duration scheduling with the given working time.
    pub fn with_fixed_duration(mut self, duration: Seconds) -> Self {
        self.sched = SchedMode::FixedDuration;
        self.duration = duration;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }
}

/// A node in the task tree together with its computed schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) task_type: TaskType,
    pub(crate) sched: SchedMode,
    pub(crate) constraint: Constraint,
    pub(crate) work: Seconds,
    pub(crate) duration: Seconds,

    // Computed by the forward pass
    pub(crate) start: NaiveDateTime,
    pub(crate) work_start: NaiveDateTime,
    pub(crate) finish: NaiveDateTime,

    // Computed by the backward pass
    pub(crate) latest_start: NaiveDateTime,
    pub(crate) latest_finish: NaiveDateTime,
    pub(crate) critical: bool,

    pub(crate) parent: Option<TaskId>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) predecessors: Vec<RelationId>,
    pub(crate) successors: Vec<RelationId>,
}

impl Task {
    pub(crate) fn from_new(id: TaskId, new: NewTask, epoch: NaiveDateTime) -> Self {
        Self {
            id,
            name: new.name,
            task_type: new.task_type,
            sched: new.sched,
            constraint: new.constraint,
            work: new.work,
            duration: new.duration,
            start: epoch,
            work_start: epoch,
            finish: epoch,
            latest_start: epoch,
            latest_finish: epoch,
            critical: false,
            parent: None,
            children: Vec::new(),
            assignments: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn is_milestone(&self) -> bool {
        self.task_type == TaskType::Milestone
    }

    pub fn sched(&self) -> SchedMode {
        self.sched
    }

    pub fn constraint(&self) -> Constraint {
        self.constraint
    }

    pub fn work(&self) -> Seconds {
        self.work
    }

    pub fn duration(&self) -> Seconds {
        self.duration
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// First instant at or after `start` that actually has work scheduled.
    pub fn work_start(&self) -> NaiveDateTime {
        self.work_start
    }

    pub fn finish(&self) -> NaiveDateTime {
        self.finish
    }

    pub fn latest_start(&self) -> NaiveDateTime {
        self.latest_start
    }

    pub fn latest_finish(&self) -> NaiveDateTime {
        self.latest_finish
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Slack between latest and earliest start, in seconds.
    pub fn slack(&self) -> Seconds {
        (self.latest_start - self.start).num_seconds()
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    pub fn is_summary(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn predecessors(&self) -> &[RelationId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[RelationId] {
        &self.successors
    }
}
