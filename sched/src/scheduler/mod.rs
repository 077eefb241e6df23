//! Calendar-aware CPM scheduling.
//!
//! [`forward_pass`] computes earliest start/finish in dependency order, then
//! [`backward_pass`] walks the same order in reverse for latest times and the
//! critical flag. Both read working time through [`ScheduleContext`].

mod backward_pass;
mod context;
mod forward_pass;
mod integration;
mod units;

pub(crate) use backward_pass::backward_pass;
pub(crate) use context::ScheduleContext;
pub(crate) use forward_pass::forward_pass;
pub(crate) use integration::{summary_duration, task_work};
pub use units::UnitsInterval;
pub(crate) use units::task_units_intervals;

#[cfg(test)]
pub(crate) mod test_support;
