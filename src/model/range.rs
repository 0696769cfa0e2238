use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::task::DateSpan;

/// The contiguous span of dates whose tasks are held in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LoadRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn intersects(&self, span: &DateSpan) -> bool {
        span.intersects(self.start, self.end)
    }
}

/// First day of `date`'s month.
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of `date`'s month.
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    start_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// `date` moved back whole months, saturating at the calendar minimum.
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// `date` moved forward whole months, saturating at the calendar maximum.
pub fn months_after(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_edges() {
        assert_eq!(start_of_month(d(2024, 2, 17)), d(2024, 2, 1));
        assert_eq!(end_of_month(d(2024, 2, 17)), d(2024, 2, 29));
        assert_eq!(end_of_month(d(2023, 12, 3)), d(2023, 12, 31));
    }

    #[test]
    fn month_offsets_clamp_day() {
        // Jan 31 + 1 month lands on the last day of February.
        assert_eq!(months_after(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(months_before(d(2024, 3, 1), 1), d(2024, 2, 1));
    }

    #[test]
    fn range_intersects_spans() {
        let range = LoadRange::new(d(2024, 1, 1), d(2024, 3, 31));
        assert!(range.intersects(&DateSpan::new(d(2023, 12, 20), d(2024, 1, 2))));
        assert!(!range.intersects(&DateSpan::new(d(2024, 4, 1), d(2024, 4, 2))));
    }
}
