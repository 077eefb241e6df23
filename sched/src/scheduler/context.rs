//! Read-only view of everything a pass needs besides the task tree.

use chrono::NaiveDateTime;

use crate::calendar::Calendar;
use crate::config::SchedulingConfig;
use crate::models::{Resource, ResourceId};

pub(crate) struct ScheduleContext<'a> {
    pub resources: &'a [Resource],
    pub calendars: &'a [Box<dyn Calendar>],
    pub project_calendar: &'a dyn Calendar,
    pub project_start: NaiveDateTime,
    pub config: &'a SchedulingConfig,
}

impl<'a> ScheduleContext<'a> {
    pub fn verbosity(&self) -> u8 {
        self.config.verbosity
    }

    /// Calendar of `resource`, or the project calendar if it has none.
    pub fn resource_calendar(&self, resource: ResourceId) -> &'a dyn Calendar {
        self.resources
            .get(resource.index())
            .and_then(Resource::calendar)
            .and_then(|id| self.calendars.get(id.index()))
            .map_or(self.project_calendar, |calendar| &**calendar)
    }
}
