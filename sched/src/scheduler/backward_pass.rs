//! Latest start/finish and the critical flag, in reverse dependency order.

use crate::events::{ChangeEvent, TaskField};
use crate::log_checks;
use crate::models::TaskId;
use crate::tree::TaskTree;

/// Compute latest times for every task in `order`, walking it backwards.
///
/// A task may finish no later than the project finish, its parent's latest
/// finish, and the latest start of each successor less the relation lag. A
/// summary successor is represented by its children. The lag is subtracted
/// whatever the relation kind.
///
/// `order` must be the order the forward pass just ran on, so successors and
/// parents are always settled before the tasks they constrain.
pub(crate) fn backward_pass(
    tree: &mut TaskTree,
    order: &[TaskId],
    verbosity: u8,
    events: &mut Vec<ChangeEvent>,
) {
    let root = tree.root();
    let Some(root_task) = tree.get_mut(root) else {
        return;
    };
    root_task.latest_start = root_task.start;
    root_task.latest_finish = root_task.finish;
    let project_finish = root_task.finish;

    for id in order.iter().rev().copied() {
        let Some(task) = tree.get(id) else {
            continue;
        };

        let mut latest_finish = match task.parent.filter(|p| *p != root) {
            Some(parent) => tree
                .get(parent)
                .map_or(project_finish, |p| project_finish.min(p.latest_finish)),
            None => project_finish,
        };

        for relation in tree.successor_relations(id) {
            let lag = chrono::Duration::seconds(relation.lag);
            let Some(successor) = tree.get(relation.successor) else {
                continue;
            };
            if successor.children.is_empty() {
                latest_finish = latest_finish.min(successor.latest_start - lag);
            } else {
                for child in successor.children.iter().filter_map(|c| tree.get(*c)) {
                    latest_finish = latest_finish.min(child.latest_start - lag);
                }
            }
        }

        // Calendar-derived span, not the duration field, so that non-working
        // time inside the task is kept.
        let latest_start = latest_finish - (task.finish - task.start);

        let Some(task) = tree.get_mut(id) else {
            continue;
        };
        task.latest_finish = latest_finish;
        task.latest_start = latest_start;

        let critical = latest_start == task.start;
        if critical != task.critical {
            task.critical = critical;
            events.push(ChangeEvent::new(id, TaskField::Critical));
            log_checks!(verbosity, task = %id, critical, "critical flag changed");
        }
    }
}
