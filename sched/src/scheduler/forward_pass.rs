//! Earliest start/finish for every task, in dependency order.

use chrono::{Duration, NaiveDateTime};

use super::integration::{calculate_finish, calculate_start_from_finish, summary_duration};
use super::ScheduleContext;
use crate::events::{ChangeEvent, TaskField};
use crate::graph::DependencyGraph;
use crate::models::{Constraint, RelationKind, SchedMode, Seconds, Task, TaskId};
use crate::tree::TaskTree;
use crate::{log_checks, log_debug};

/// New computed values for one task.
struct Computed {
    start: NaiveDateTime,
    work_start: NaiveDateTime,
    finish: NaiveDateTime,
    duration: Seconds,
    /// Summary work, aggregated from the children.
    work: Option<Seconds>,
    /// Assignment units recomputed for a fixed-duration task.
    units: Option<i32>,
}

/// Schedule every task in `order`, then the root as the summary of the whole
/// tree. Pushes an event for each start, finish or duration that changed.
pub(crate) fn forward_pass(
    ctx: &ScheduleContext<'_>,
    tree: &mut TaskTree,
    graph: &DependencyGraph,
    order: &[TaskId],
    events: &mut Vec<ChangeEvent>,
) {
    for id in order {
        schedule_task(ctx, tree, graph, *id, events);
    }
    let root = tree.root();
    schedule_task(ctx, tree, graph, root, events);
}

fn schedule_task(
    ctx: &ScheduleContext<'_>,
    tree: &mut TaskTree,
    graph: &DependencyGraph,
    id: TaskId,
    events: &mut Vec<ChangeEvent>,
) {
    let Some(task) = tree.get(id) else {
        return;
    };

    let computed = if task.is_summary() {
        aggregate_children(ctx, tree, task)
    } else {
        schedule_leaf(ctx, tree, graph, task)
    };

    let Some(task) = tree.get_mut(id) else {
        return;
    };
    if task.start != computed.start {
        events.push(ChangeEvent::new(id, TaskField::Start));
    }
    if task.finish != computed.finish {
        events.push(ChangeEvent::new(id, TaskField::Finish));
    }
    if task.duration != computed.duration {
        events.push(ChangeEvent::new(id, TaskField::Duration));
    }

    task.start = computed.start;
    task.work_start = computed.work_start;
    task.finish = computed.finish;
    task.duration = computed.duration;
    if let Some(work) = computed.work {
        task.work = work;
    }
    if let Some(units) = computed.units {
        for assignment in &mut task.assignments {
            assignment.units = units;
        }
    }

    log_checks!(
        ctx.verbosity(),
        task = %id,
        start = %task.start,
        finish = %task.finish,
        "scheduled"
    );
}

/// A summary spans its children; its duration counts project calendar time
/// only.
fn aggregate_children(ctx: &ScheduleContext<'_>, tree: &TaskTree, task: &Task) -> Computed {
    let children = task.children.iter().filter_map(|child| tree.get(*child));

    let mut start: Option<NaiveDateTime> = None;
    let mut work_start: Option<NaiveDateTime> = None;
    let mut finish: Option<NaiveDateTime> = None;
    let mut work: Seconds = 0;
    for child in children {
        start = Some(start.map_or(child.start, |s| s.min(child.start)));
        work_start = Some(work_start.map_or(child.work_start, |s| s.min(child.work_start)));
        finish = Some(finish.map_or(child.finish, |f| f.max(child.finish)));
        work += child.work;
    }

    let start = start.unwrap_or(task.start);
    let finish = finish.unwrap_or(task.finish);
    let duration = if task.id == tree.root() {
        0
    } else {
        summary_duration(ctx.project_calendar, start, finish)
    };

    Computed {
        start,
        work_start: work_start.unwrap_or(start),
        finish,
        duration,
        work: Some(work),
        units: None,
    }
}

fn schedule_leaf(
    ctx: &ScheduleContext<'_>,
    tree: &TaskTree,
    graph: &DependencyGraph,
    task: &Task,
) -> Computed {
    let start = earliest_start(ctx, tree, graph, task);
    let outcome = calculate_finish(ctx, task, start);

    let mut duration = outcome.duration;
    let mut units = None;
    if task.sched == SchedMode::FixedDuration {
        duration = task.duration;
        let n = task.assignments.len() as f64;
        if task.duration > 0 && n > 0.0 {
            units = Some((100.0 * task.work as f64 / task.duration as f64 / n).round() as i32);
        }
        log_debug!(ctx.verbosity(), task = %task.id, effort = outcome.effort, ?units, "fixed duration");
    }

    Computed {
        start,
        work_start: outcome.work_start,
        finish: outcome.finish,
        duration,
        work: None,
        units,
    }
}

/// Latest of the project start and every relation binding the task, then
/// clamped by the task's constraint.
fn earliest_start(
    ctx: &ScheduleContext<'_>,
    tree: &TaskTree,
    graph: &DependencyGraph,
    task: &Task,
) -> NaiveDateTime {
    let mut start = ctx.project_start;

    for (_, relation_id) in graph.binding_relations(task.id) {
        let Some(relation) = tree.relation(*relation_id) else {
            continue;
        };
        let Some(predecessor) = tree.get(relation.predecessor) else {
            continue;
        };
        let lag = Duration::seconds(relation.lag);

        let candidate = match relation.kind {
            RelationKind::FinishToStart => predecessor.finish + lag,
            RelationKind::StartToStart => predecessor.start + lag,
            RelationKind::FinishToFinish => {
                calculate_start_from_finish(ctx, task, predecessor.finish + lag)
            }
            RelationKind::StartToFinish => {
                calculate_start_from_finish(ctx, task, predecessor.start) + lag
            }
        };
        start = start.max(candidate);
    }

    match task.constraint {
        Constraint::AsSoonAsPossible => start,
        Constraint::StartNoEarlierThan(at) => start.max(at),
        Constraint::MustStartOn(at) => ctx.project_start.max(at),
        Constraint::AsLateAsPossible | Constraint::FinishNoLaterThan(_) => {
            tracing::warn!(
                task = %task.id,
                constraint = ?task.constraint,
                "constraint not implemented, scheduling as soon as possible"
            );
            start
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::topological_sort;
    use crate::models::{Assignment, NewTask, ResourceId};
    use crate::scheduler::test_support::{at, Fixture, H};

    fn run(fixture: &Fixture, tree: &mut TaskTree) -> Vec<ChangeEvent> {
        let graph = DependencyGraph::build(tree);
        let order = topological_sort(&graph).unwrap();
        let mut events = Vec::new();
        forward_pass(&fixture.ctx(), tree, &graph, &order, &mut events);
        events
    }

    fn task(tree: &TaskTree, id: TaskId) -> &Task {
        tree.get(id).unwrap()
    }

    #[test]
    fn test_finish_to_start_chain() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let a = tree.insert(None, None, NewTask::new("a").with_work(8 * H)).unwrap();
        let b = tree.insert(None, None, NewTask::new("b").with_work(8 * H)).unwrap();
        tree.add_relation(a, b, RelationKind::FinishToStart, 0).unwrap();

        run(&fixture, &mut tree);
        assert_eq!(task(&tree, a).finish, at(0, 16, 0));
        assert_eq!(task(&tree, b).start, at(0, 16, 0));
        assert_eq!(task(&tree, b).work_start, at(1, 8, 0));
        assert_eq!(task(&tree, b).finish, at(1, 16, 0));

        let root = task(&tree, tree.root());
        assert_eq!(root.start, at(0, 8, 0));
        assert_eq!(root.finish, at(1, 16, 0));
        assert_eq!(root.work, 16 * H);
    }

    #[test]
    fn test_relation_kinds_and_lag() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let a = tree.insert(None, None, NewTask::new("a").with_work(16 * H)).unwrap();
        let ss = tree.insert(None, None, NewTask::new("ss").with_work(4 * H)).unwrap();
        let ff = tree.insert(None, None, NewTask::new("ff").with_work(4 * H)).unwrap();
        tree.add_relation(a, ss, RelationKind::StartToStart, 2 * H).unwrap();
        tree.add_relation(a, ff, RelationKind::FinishToFinish, 0).unwrap();

        run(&fixture, &mut tree);
        assert_eq!(task(&tree, a).finish, at(1, 16, 0));
        assert_eq!(task(&tree, ss).start, at(0, 10, 0));
        // ff must finish with a, so it starts four working hours earlier
        assert_eq!(task(&tree, ff).start, at(1, 12, 0));
        assert_eq!(task(&tree, ff).finish, at(1, 16, 0));
    }

    #[test]
    fn test_start_to_finish_uses_all_candidates() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let late = tree.insert(None, None, NewTask::new("late").with_work(16 * H)).unwrap();
        let early = tree.insert(None, None, NewTask::new("early").with_work(4 * H)).unwrap();
        let succ = tree.insert(None, None, NewTask::new("succ").with_work(4 * H)).unwrap();
        tree.add_relation(late, succ, RelationKind::FinishToStart, 0).unwrap();
        tree.add_relation(early, succ, RelationKind::StartToFinish, 0).unwrap();

        run(&fixture, &mut tree);
        // The start-to-finish candidate is clamped to the project start and
        // must not override the later finish-to-start candidate.
        assert_eq!(task(&tree, succ).start, at(1, 16, 0));
    }

    #[test]
    fn test_summary_predecessor_binds_children() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let pred = tree.insert(None, None, NewTask::new("pred").with_work(8 * H)).unwrap();
        let summary = tree.insert(None, None, NewTask::new("summary")).unwrap();
        let x = tree.insert(Some(summary), None, NewTask::new("x").with_work(4 * H)).unwrap();
        let y = tree.insert(Some(summary), None, NewTask::new("y").with_work(8 * H)).unwrap();
        tree.add_relation(pred, summary, RelationKind::FinishToStart, 0).unwrap();

        run(&fixture, &mut tree);
        assert_eq!(task(&tree, x).start, at(0, 16, 0));
        assert_eq!(task(&tree, y).start, at(0, 16, 0));
        let summary = task(&tree, summary);
        assert_eq!(summary.start, at(0, 16, 0));
        assert_eq!(summary.work_start, at(1, 8, 0));
        assert_eq!(summary.finish, at(1, 16, 0));
        assert_eq!(summary.work, 12 * H);
        assert_eq!(summary.duration, 8 * H);
    }

    #[test]
    fn test_constraints() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let a = tree.insert(None, None, NewTask::new("a").with_work(8 * H)).unwrap();
        let constrained = |name: &str, constraint| {
            NewTask::new(name).with_work(H).with_constraint(constraint)
        };
        let snet = tree
            .insert(None, None, constrained("snet", Constraint::StartNoEarlierThan(at(2, 9, 0))))
            .unwrap();
        let mso = tree
            .insert(None, None, constrained("mso", Constraint::MustStartOn(at(0, 9, 0))))
            .unwrap();
        let alap = tree
            .insert(None, None, constrained("alap", Constraint::AsLateAsPossible))
            .unwrap();
        // Must-start-on wins over a later predecessor
        tree.add_relation(a, mso, RelationKind::FinishToStart, 0).unwrap();

        run(&fixture, &mut tree);
        assert_eq!(task(&tree, snet).start, at(2, 9, 0));
        assert_eq!(task(&tree, mso).start, at(0, 9, 0));
        assert_eq!(task(&tree, alap).start, at(0, 8, 0));
    }

    #[test]
    fn test_fixed_duration_recomputes_units() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let a = tree
            .insert(None, None, NewTask::new("a").with_work(8 * H).with_fixed_duration(16 * H))
            .unwrap();
        tree.add_assignment(a, Assignment { resource: ResourceId(0), units: 100 }).unwrap();

        let events = run(&fixture, &mut tree);
        let a_task = task(&tree, a);
        assert_eq!(a_task.finish, at(1, 16, 0));
        assert_eq!(a_task.duration, 16 * H);
        assert_eq!(a_task.assignments[0].units, 50);
        assert!(!events.contains(&ChangeEvent::new(a, TaskField::Duration)));
    }

    #[test]
    fn test_events_only_on_change() {
        let fixture = Fixture::on_calendar(2);
        let mut tree = TaskTree::new(fixture.project_start);
        let a = tree.insert(None, None, NewTask::new("a").with_work(8 * H)).unwrap();

        let first = run(&fixture, &mut tree);
        // Start was already at the project start
        assert!(!first.contains(&ChangeEvent::new(a, TaskField::Start)));
        assert!(first.contains(&ChangeEvent::new(a, TaskField::Finish)));
        assert!(first.contains(&ChangeEvent::new(a, TaskField::Duration)));

        assert!(run(&fixture, &mut tree).is_empty());
    }
}
