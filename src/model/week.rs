use chrono::{Datelike, Duration, NaiveDate};

use super::task::DateSpan;

/// Number of day columns in a rendered week.
pub const DAYS_PER_WEEK: usize = 7;

/// The seven days currently shown on screen, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekWindow {
    /// Monday of the displayed week.
    pub start: NaiveDate,
}

impl WeekWindow {
    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let weekday = date.weekday().num_days_from_monday();
        Self {
            start: date - Duration::days(weekday as i64),
        }
    }

    /// The week containing today's local date.
    pub fn current() -> Self {
        Self::containing(chrono::Local::now().date_naive())
    }

    /// Sunday of the displayed week.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(DAYS_PER_WEEK as i64 - 1)
    }

    pub fn day(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }

    pub fn days(&self) -> [NaiveDate; DAYS_PER_WEEK] {
        std::array::from_fn(|i| self.day(i))
    }

    /// Signed offset of `date` from Monday; outside 0..=6 when off-week.
    pub fn day_index(&self, date: NaiveDate) -> i64 {
        (date - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (0..DAYS_PER_WEEK as i64).contains(&self.day_index(date))
    }

    pub fn intersects(&self, span: &DateSpan) -> bool {
        span.intersects(self.start, self.end())
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(DAYS_PER_WEEK as i64),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(DAYS_PER_WEEK as i64),
        }
    }
}
