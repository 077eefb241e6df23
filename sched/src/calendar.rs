//! Working-time calendars.
//!
//! The scheduling core only needs one thing from a calendar: the ordered list
//! of working intervals for a given day. [`WorkCalendar`] is the stock
//! implementation; hosts with their own calendar model implement [`Calendar`].

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::models::{Seconds, SECONDS_PER_DAY, SECONDS_PER_HOUR};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid work interval {start}..{end}: must satisfy 0 <= start < end <= 86400")]
    InvalidInterval { start: Seconds, end: Seconds },
    #[error("work intervals overlap or are out of order at offset {0}")]
    Unordered(Seconds),
}

/// A span of working time within one day, as second offsets from midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkInterval {
    start: Seconds,
    end: Seconds,
}

impl WorkInterval {
    pub fn new(start: Seconds, end: Seconds) -> Result<Self, CalendarError> {
        if start < 0 || end > SECONDS_PER_DAY || start >= end {
            return Err(CalendarError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Interval between two whole hours, e.g. `hours(8, 12)`.
    pub fn hours(start_hour: u32, end_hour: u32) -> Result<Self, CalendarError> {
        Self::new(
            start_hour as Seconds * SECONDS_PER_HOUR,
            end_hour as Seconds * SECONDS_PER_HOUR,
        )
    }

    pub fn start(&self) -> Seconds {
        self.start
    }

    pub fn end(&self) -> Seconds {
        self.end
    }

    pub fn len(&self) -> Seconds {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of working time for a day.
pub trait Calendar: fmt::Debug {
    /// Ordered, non-overlapping working intervals for `date`.
    fn day_intervals(&self, date: NaiveDate) -> Vec<WorkInterval>;

    /// Total working seconds on `date`.
    fn working_seconds(&self, date: NaiveDate) -> Seconds {
        self.day_intervals(date).iter().map(WorkInterval::len).sum()
    }
}

/// Weekly working pattern with holidays and per-date overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkCalendar {
    working_days: FxHashSet<Weekday>,
    day_intervals: Vec<WorkInterval>,
    holidays: FxHashSet<NaiveDate>,
    overrides: FxHashMap<NaiveDate, Vec<WorkInterval>>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::standard()
    }
}

impl WorkCalendar {
    const WEEKDAYS: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    /// Monday to Friday, 08:00-12:00 and 13:00-17:00.
    pub fn standard() -> Self {
        Self {
            working_days: Self::WEEKDAYS.into_iter().collect(),
            day_intervals: vec![
                WorkInterval { start: 8 * SECONDS_PER_HOUR, end: 12 * SECONDS_PER_HOUR },
                WorkInterval { start: 13 * SECONDS_PER_HOUR, end: 17 * SECONDS_PER_HOUR },
            ],
            holidays: FxHashSet::default(),
            overrides: FxHashMap::default(),
        }
    }

    /// Custom weekly pattern. An empty `working_days` set is allowed and
    /// yields a calendar without any working time.
    pub fn custom<I, J>(working_days: I, intervals: J) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = WorkInterval>,
    {
        let day_intervals = Self::normalize(intervals)?;
        Ok(Self {
            working_days: working_days.into_iter().collect(),
            day_intervals,
            holidays: FxHashSet::default(),
            overrides: FxHashMap::default(),
        })
    }

    /// Every day of the week, one interval of `hours_per_day` starting at 08:00
    /// (or midnight for a 24-hour day).
    pub fn every_day(hours_per_day: u32) -> Result<Self, CalendarError> {
        let start = if hours_per_day >= 16 { 0 } else { 8 };
        Self::custom(
            Self::WEEKDAYS
                .into_iter()
                .chain([Weekday::Sat, Weekday::Sun]),
            [WorkInterval::hours(start, start + hours_per_day)?],
        )
    }

    fn normalize<J>(intervals: J) -> Result<Vec<WorkInterval>, CalendarError>
    where
        J: IntoIterator<Item = WorkInterval>,
    {
        let mut list: Vec<WorkInterval> = intervals.into_iter().collect();
        list.sort();
        for pair in list.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(CalendarError::Unordered(pair[1].start));
            }
        }
        Ok(list)
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Mark every date in `first..=last` as a holiday.
    pub fn add_holiday_range(&mut self, first: NaiveDate, last: NaiveDate) {
        for date in first.iter_days().take_while(|d| *d <= last) {
            self.holidays.insert(date);
        }
    }

    pub fn remove_holiday(&mut self, date: NaiveDate) -> bool {
        self.holidays.remove(&date)
    }

    /// Replace the working intervals of a single date. Overrides win over
    /// both the weekly pattern and holidays.
    pub fn set_day_override<J>(&mut self, date: NaiveDate, intervals: J) -> Result<(), CalendarError>
    where
        J: IntoIterator<Item = WorkInterval>,
    {
        let list = Self::normalize(intervals)?;
        self.overrides.insert(date, list);
        Ok(())
    }

    pub fn set_working_days<I>(&mut self, days: I)
    where
        I: IntoIterator<Item = Weekday>,
    {
        self.working_days = days.into_iter().collect();
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.day_intervals(date).is_empty()
    }
}

impl Calendar for WorkCalendar {
    fn day_intervals(&self, date: NaiveDate) -> Vec<WorkInterval> {
        if let Some(list) = self.overrides.get(&date) {
            return list.clone();
        }
        if self.holidays.contains(&date) || !self.working_days.contains(&date.weekday()) {
            return Vec::new();
        }
        self.day_intervals.clone()
    }
}
