//! Shared fixtures for scheduler unit tests.

use chrono::{NaiveDate, NaiveDateTime, Weekday};

use super::ScheduleContext;
use crate::calendar::{Calendar, WorkCalendar, WorkInterval};
use crate::config::SchedulingConfig;
use crate::models::{CalendarId, Resource, ResourceId, Seconds};

pub(crate) const H: Seconds = 3600;

/// 2025-01-06 is a Monday.
pub(crate) fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6 + offset).unwrap()
}

/// `offset` days after Monday 2025-01-06, at `hour`:`min`.
pub(crate) fn at(offset: u32, hour: u32, min: u32) -> NaiveDateTime {
    day(offset).and_hms_opt(hour, min, 0).unwrap()
}

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Project calendar (0) is the standard 8-12/13-17 week, calendar 1 works
/// 10-14 on weekdays, calendar 2 is a single 8-16 block and calendar 3 never
/// works. Resource 0 uses the project calendar, resource 1 calendar 1.
pub(crate) struct Fixture {
    pub calendars: Vec<Box<dyn Calendar>>,
    pub resources: Vec<Resource>,
    pub config: SchedulingConfig,
    pub project_calendar: usize,
    pub project_start: NaiveDateTime,
}

impl Fixture {
    pub fn new() -> Self {
        let late = WorkCalendar::custom(WEEKDAYS, [WorkInterval::hours(10, 14).unwrap()]).unwrap();
        let block = WorkCalendar::custom(WEEKDAYS, [WorkInterval::hours(8, 16).unwrap()]).unwrap();
        let never = WorkCalendar::custom(Vec::<Weekday>::new(), [WorkInterval::hours(8, 16).unwrap()])
            .unwrap();
        Self {
            calendars: vec![
                Box::new(WorkCalendar::standard()),
                Box::new(late),
                Box::new(block),
                Box::new(never),
            ],
            resources: vec![
                Resource {
                    id: ResourceId(0),
                    name: "ann".into(),
                    calendar: None,
                },
                Resource {
                    id: ResourceId(1),
                    name: "bob".into(),
                    calendar: Some(CalendarId(1)),
                },
            ],
            config: SchedulingConfig::default(),
            project_calendar: 0,
            project_start: at(0, 8, 0),
        }
    }

    /// Same fixture with calendar `index` as the project calendar.
    pub fn on_calendar(index: usize) -> Self {
        Self {
            project_calendar: index,
            ..Self::new()
        }
    }

    pub fn ctx(&self) -> ScheduleContext<'_> {
        ScheduleContext {
            resources: &self.resources,
            calendars: &self.calendars,
            project_calendar: self.calendars[self.project_calendar].as_ref(),
            project_start: self.project_start,
            config: &self.config,
        }
    }
}
