//! Per-day capacity profile of a task's assignments.

use chrono::NaiveDate;

use super::ScheduleContext;
use crate::log_debug;
use crate::models::{Seconds, Task};

/// A span of one day during which the task's resources work at a combined
/// `units` percentage. Offsets are seconds from midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitsInterval {
    pub start: Seconds,
    pub end: Seconds,
    /// Summed assignment units, 100 = one full-time resource.
    pub units: i32,
    /// Number of assigned resources working during the span. Zero for
    /// unassigned tasks, which run on the project calendar.
    pub res_n: u32,
}

impl UnitsInterval {
    pub fn len(&self) -> Seconds {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }
}

/// Start or end of one resource's working interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Edge {
    at: Seconds,
    units: i32,
    is_start: bool,
}

/// Capacity intervals of `task` on `date`, in time order, zero-capacity gaps
/// left out.
///
/// Each assignment contributes its resource's working intervals (or the
/// project calendar's when the resource has none). An unassigned task
/// behaves like one full-time resource on the project calendar.
pub(crate) fn task_units_intervals(
    ctx: &ScheduleContext<'_>,
    task: &Task,
    date: NaiveDate,
) -> Vec<UnitsInterval> {
    let mut edges = Vec::new();

    if task.assignments.is_empty() {
        for ival in ctx.project_calendar.day_intervals(date) {
            push_interval(&mut edges, ival.start(), ival.end(), 100);
        }
    } else {
        for assignment in &task.assignments {
            let calendar = ctx.resource_calendar(assignment.resource);
            for ival in calendar.day_intervals(date) {
                push_interval(&mut edges, ival.start(), ival.end(), assignment.units);
            }
        }
    }

    let intervals = sweep(edges, !task.assignments.is_empty());
    log_debug!(ctx.verbosity(), task = %task.id, %date, ?intervals, "units intervals");
    intervals
}

fn push_interval(edges: &mut Vec<Edge>, start: Seconds, end: Seconds, units: i32) {
    edges.push(Edge { at: start, units, is_start: true });
    edges.push(Edge { at: end, units, is_start: false });
}

/// Merge start/end edges into consecutive spans with their summed units.
///
/// Edges at the same instant apply starts before ends, so back-to-back
/// intervals never produce a spurious dip in `res_n`.
fn sweep(mut edges: Vec<Edge>, count_resources: bool) -> Vec<UnitsInterval> {
    edges.sort_by_key(|edge| (edge.at, !edge.is_start));

    let mut out = Vec::new();
    let mut point: Option<Seconds> = None;
    let mut units = 0;
    let mut res_n: u32 = 0;

    for edge in edges {
        if let Some(previous) = point {
            if edge.at != previous && units > 0 {
                out.push(UnitsInterval {
                    start: previous,
                    end: edge.at,
                    units,
                    res_n,
                });
            }
        }
        point = Some(edge.at);

        if edge.is_start {
            units += edge.units;
            if count_resources {
                res_n += 1;
            }
        } else {
            units -= edge.units;
            if count_resources {
                res_n = res_n.saturating_sub(1);
            }
        }
    }
    out
}
