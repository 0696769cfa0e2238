use chrono::NaiveDate;

use crate::model::range::{end_of_month, months_after, months_before, start_of_month};
use crate::model::{DateSpan, LoadRange};

/// Months of padding loaded beyond whatever date triggered an expansion.
pub const DEFAULT_SLACK_MONTHS: u32 = 1;

/// What a re-fetch should ask the backend for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    Range(LoadRange),
    All,
}

/// The span of dates held in memory.
///
/// The range only ever grows, in whole months, and always keeps some slack
/// past the date that forced it to grow so that paging one week further does
/// not immediately trigger another fetch. Once everything is loaded the
/// range stops mattering for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    range: LoadRange,
    all_loaded: bool,
    slack_months: u32,
}

impl DateWindow {
    pub fn new(range: LoadRange) -> Self {
        Self {
            range,
            all_loaded: false,
            slack_months: DEFAULT_SLACK_MONTHS,
        }
    }

    /// `date`'s month padded by `slack_months` on both sides.
    pub fn around(date: NaiveDate, slack_months: u32) -> Self {
        let start = months_before(start_of_month(date), slack_months);
        let end = end_of_month(months_after(start_of_month(date), slack_months));
        Self {
            range: LoadRange::new(start, end),
            all_loaded: false,
            slack_months,
        }
    }

    pub fn with_slack_months(mut self, slack_months: u32) -> Self {
        self.slack_months = slack_months;
        self
    }

    pub fn range(&self) -> LoadRange {
        self.range
    }

    pub fn is_all_loaded(&self) -> bool {
        self.all_loaded
    }

    /// Grow the range so it covers `target`. Returns whether anything changed.
    pub fn expand_to_include(&mut self, target: NaiveDate) -> bool {
        if self.all_loaded {
            return false;
        }

        let mut changed = false;
        if target < self.range.start {
            self.range.start = months_before(start_of_month(target), self.slack_months);
            changed = true;
        }
        if target > self.range.end {
            // Step from the first of the month so short months don't clip the end.
            self.range.end = end_of_month(months_after(start_of_month(target), self.slack_months));
            changed = true;
        }
        if changed {
            tracing::info!(
                start = %self.range.start,
                end = %self.range.end,
                %target,
                "expanded load range"
            );
        }
        changed
    }

    /// Stop range filtering for the rest of the session.
    ///
    /// Returns whether this call flipped the flag.
    pub fn load_all(&mut self) -> bool {
        if self.all_loaded {
            return false;
        }
        self.all_loaded = true;
        tracing::info!("switched to loading all tasks");
        true
    }

    pub fn fetch_scope(&self) -> FetchScope {
        if self.all_loaded {
            FetchScope::All
        } else {
            FetchScope::Range(self.range)
        }
    }
}

impl FetchScope {
    pub fn covers(&self, span: &DateSpan) -> bool {
        match self {
            FetchScope::All => true,
            FetchScope::Range(range) => range.intersects(span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn q1() -> DateWindow {
        DateWindow::new(LoadRange::new(d(2024, 1, 1), d(2024, 3, 31)))
    }

    #[test]
    fn navigating_past_the_end_adds_a_month_of_slack() {
        let mut window = q1();
        assert!(window.expand_to_include(d(2024, 4, 15)));
        assert_eq!(window.range().end, d(2024, 5, 31));
        assert_eq!(window.range().start, d(2024, 1, 1));
    }

    #[test]
    fn navigating_before_the_start_adds_a_month_of_slack() {
        let mut window = q1();
        assert!(window.expand_to_include(d(2023, 12, 20)));
        assert_eq!(window.range().start, d(2023, 11, 1));
        assert_eq!(window.range().end, d(2024, 3, 31));
    }

    #[test]
    fn inside_range_is_a_no_op() {
        let mut window = q1();
        assert!(!window.expand_to_include(d(2024, 2, 10)));
        assert!(!window.expand_to_include(d(2024, 3, 31)));
        assert_eq!(window, q1());
    }

    #[test]
    fn load_all_freezes_the_range() {
        let mut window = q1();
        assert!(window.load_all());
        assert!(!window.load_all());
        assert!(!window.expand_to_include(d(2030, 1, 1)));
        assert_eq!(window.range(), q1().range());
        assert_eq!(window.fetch_scope(), FetchScope::All);
    }

    #[test]
    fn around_pads_both_sides() {
        let window = DateWindow::around(d(2024, 1, 31), 1);
        assert_eq!(window.range(), LoadRange::new(d(2023, 12, 1), d(2024, 2, 29)));
        let wide = DateWindow::around(d(2024, 6, 15), 2);
        assert_eq!(wide.range(), LoadRange::new(d(2024, 4, 1), d(2024, 8, 31)));
    }

    #[test]
    fn slack_is_configurable() {
        let mut window = q1().with_slack_months(2);
        window.expand_to_include(d(2024, 4, 2));
        assert_eq!(window.range().end, d(2024, 6, 30));
    }
}
