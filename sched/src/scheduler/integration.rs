//! Walks calendars day by day to convert between work, duration and time.
//!
//! All walks share the same stall guard: if `stall_guard_days` simulated days
//! pass from the first day of the walk without any work done, the walk gives
//! up and returns a fallback so that a calendar without working time can't
//! hang the scheduler. Once some work is done the guard no longer applies, so
//! long holidays inside a task are walked through.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use super::{task_units_intervals, ScheduleContext};
use crate::calendar::Calendar;
use crate::models::{SchedMode, Seconds, Task};

/// Result of integrating a task forward from its start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FinishOutcome {
    pub finish: NaiveDateTime,
    /// First instant at or after the start with working capacity.
    pub work_start: NaiveDateTime,
    /// Working time between start and finish.
    pub duration: Seconds,
    /// Units-weighted effort delivered between start and finish.
    pub effort: Seconds,
    /// The walk hit the stall guard.
    pub stalled: bool,
}

fn day_start(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_time(NaiveTime::MIN)
}

fn offset(day: NaiveDateTime, seconds: Seconds) -> NaiveDateTime {
    day + Duration::seconds(seconds)
}

/// Effort produced by `units` percent over `len` seconds, rounded to the
/// nearest second (ties away from zero).
fn weighted(units: i32, len: Seconds) -> Seconds {
    (units as f64 * len as f64 / 100.0).round() as Seconds
}

/// Time `units` percent needs to produce `effort`.
fn time_for(effort: Seconds, units: i32) -> Seconds {
    (effort as f64 * 100.0 / units as f64).round() as Seconds
}

/// Finish of `task` when started at `start`.
///
/// Fixed-work tasks accumulate effort until it covers `work`; fixed-duration
/// tasks accumulate working time until it covers `duration` and report the
/// effort delivered on the side. Milestones finish where they start.
pub(crate) fn calculate_finish(
    ctx: &ScheduleContext<'_>,
    task: &Task,
    start: NaiveDateTime,
) -> FinishOutcome {
    if task.is_milestone() {
        return FinishOutcome {
            finish: start,
            work_start: milestone_work_start(ctx, task, start),
            duration: 0,
            effort: 0,
            stalled: false,
        };
    }

    let fixed_work = task.sched == SchedMode::FixedWork;
    let target = if fixed_work { task.work } else { task.duration };
    let guard = ctx.config.stall_guard_secs();

    let mut elapsed: Seconds = 0;
    let mut effort: Seconds = 0;
    let mut work_start: Option<NaiveDateTime> = None;
    let first_day = day_start(start);
    let mut day = first_day;

    loop {
        let progress = if fixed_work { effort } else { elapsed };
        if progress == 0 && (day - first_day).num_seconds() > guard {
            tracing::warn!(
                task = %task.id,
                %start,
                "no working time within {} days, giving up",
                ctx.config.stall_guard_days
            );
            return FinishOutcome {
                finish: day,
                work_start: work_start.unwrap_or(start),
                duration: elapsed,
                effort,
                stalled: true,
            };
        }

        for ival in task_units_intervals(ctx, task, day.date()) {
            let t1 = offset(day, ival.start).max(start);
            let t2 = offset(day, ival.end);
            if t1 >= t2 {
                continue;
            }
            let len = (t2 - t1).num_seconds();
            let first_work = *work_start.get_or_insert(t1);

            if fixed_work {
                let delta = weighted(ival.units, len);
                if effort + delta >= target {
                    let needed = time_for(target - effort, ival.units).min(len);
                    return FinishOutcome {
                        finish: offset(t1, needed),
                        work_start: first_work,
                        duration: elapsed + needed,
                        effort: target,
                        stalled: false,
                    };
                }
                effort += delta;
            } else if elapsed + len >= target {
                let needed = target - elapsed;
                return FinishOutcome {
                    finish: offset(t1, needed),
                    work_start: first_work,
                    duration: target,
                    effort: effort + weighted(ival.units, needed),
                    stalled: false,
                };
            } else {
                effort += weighted(ival.units, len);
            }
            elapsed += len;
        }

        day += Duration::days(1);
    }
}

/// Latest start of `task` that still lets it finish at `finish`, walking the
/// calendar backwards. Never earlier than the project start.
pub(crate) fn calculate_start_from_finish(
    ctx: &ScheduleContext<'_>,
    task: &Task,
    finish: NaiveDateTime,
) -> NaiveDateTime {
    let project_start = ctx.project_start;
    if task.is_milestone() {
        return finish.max(project_start);
    }

    let fixed_work = task.sched == SchedMode::FixedWork;
    let target = if fixed_work { task.work } else { task.duration };
    let guard = ctx.config.stall_guard_secs();

    let mut done: Seconds = 0;
    let last_day = day_start(finish);
    let mut day = last_day;

    loop {
        if day + Duration::days(1) <= project_start {
            return project_start;
        }
        if done == 0 && (last_day - day).num_seconds() > guard {
            return day.max(project_start);
        }

        for ival in task_units_intervals(ctx, task, day.date()).iter().rev() {
            let t1 = offset(day, ival.start);
            let t2 = offset(day, ival.end).min(finish);
            if t1 >= t2 {
                continue;
            }
            let len = (t2 - t1).num_seconds();

            let delta = if fixed_work {
                weighted(ival.units, len)
            } else {
                len
            };
            if done + delta >= target {
                let needed = if fixed_work {
                    time_for(target - done, ival.units).min(len)
                } else {
                    target - done
                };
                return offset(t2, -needed).max(project_start);
            }
            done += delta;
        }

        day -= Duration::days(1);
    }
}

/// First instant at or after `start` where `task` has working capacity, or
/// `start` itself if none turns up before the stall guard.
pub(crate) fn milestone_work_start(
    ctx: &ScheduleContext<'_>,
    task: &Task,
    start: NaiveDateTime,
) -> NaiveDateTime {
    let guard = ctx.config.stall_guard_secs();
    let first_day = day_start(start);
    let mut day = first_day;

    while (day - first_day).num_seconds() <= guard {
        for ival in task_units_intervals(ctx, task, day.date()) {
            if offset(day, ival.end) <= start {
                continue;
            }
            return offset(day, ival.start).max(start);
        }
        day += Duration::days(1);
    }
    start
}

/// Units-weighted work `task`'s resources deliver between `start` and
/// `finish`.
pub(crate) fn task_work(
    ctx: &ScheduleContext<'_>,
    task: &Task,
    start: NaiveDateTime,
    finish: NaiveDateTime,
) -> Seconds {
    if finish <= start {
        return 0;
    }

    let guard = ctx.config.stall_guard_secs();
    let mut work: Seconds = 0;
    let first_day = day_start(start);
    let mut day = first_day;

    while day < finish {
        if work == 0 && (day - first_day).num_seconds() > guard {
            break;
        }
        for ival in task_units_intervals(ctx, task, day.date()) {
            let t1 = offset(day, ival.start).max(start);
            let t2 = offset(day, ival.end).min(finish);
            if t1 >= t2 {
                continue;
            }
            work += weighted(ival.units, (t2 - t1).num_seconds());
        }
        day += Duration::days(1);
    }
    work
}

/// Working time of `calendar` between `start` and `finish`.
pub(crate) fn summary_duration(
    calendar: &dyn Calendar,
    start: NaiveDateTime,
    finish: NaiveDateTime,
) -> Seconds {
    let mut duration: Seconds = 0;
    let mut day = day_start(start);

    while day < finish {
        for ival in calendar.day_intervals(day.date()) {
            let t1 = offset(day, ival.start()).max(start);
            let t2 = offset(day, ival.end()).min(finish);
            if t1 < t2 {
                duration += (t2 - t1).num_seconds();
            }
        }
        day += Duration::days(1);
    }
    duration
}
