//! Scheduling core of a project planner.
//!
//! Given a tree of tasks, resource assignments, calendars and dependency
//! relations, this crate computes every task's start and finish, rejects edits
//! that would create a dependency loop, and marks the critical path.
//!
//! [`TaskManager`] is the entry point: hosts push edits into it and read the
//! computed fields back from [`Task`]. Each edit rebuilds the dependency graph
//! when its shape changed, then runs a forward pass (earliest times) and a
//! backward pass (latest times and the critical flag). Changed fields are
//! reported as [`ChangeEvent`]s.

pub mod logging;

pub mod calendar;
mod config;
mod events;
pub mod graph;
mod manager;
mod models;
mod scheduler;
mod tree;

pub use calendar::{Calendar, CalendarError, WorkCalendar, WorkInterval};
pub use config::SchedulingConfig;
pub use events::{ChangeEvent, Invalidation, TaskField};
pub use graph::{CycleError, DependencyGraph, GraphError};
pub use manager::{SchedulePhase, TaskManager, TaskManagerError};
pub use models::{
    Assignment, CalendarId, Constraint, NewTask, Relation, RelationId, RelationKind, Resource,
    ResourceId, SchedMode, Seconds, Task, TaskId, TaskType, SECONDS_PER_DAY, SECONDS_PER_HOUR,
};
pub use scheduler::UnitsInterval;
pub use tree::{TaskTree, TreeError, MAX_LAG};
