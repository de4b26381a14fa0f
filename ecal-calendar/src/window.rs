//! The six-week date range shown on the calendar.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of weeks covered by a window.
pub const WINDOW_WEEKS: i64 = 6;

/// First day of the calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// Map the `first_day` setting: 0 is Sunday, anything else Monday.
    pub fn from_first_day(first_day: u8) -> Self {
        if first_day == 0 {
            Self::Sunday
        } else {
            Self::Monday
        }
    }

    /// Days elapsed since the start of the week containing `day`.
    fn days_into_week(&self, day: NaiveDate) -> i64 {
        match self {
            Self::Sunday => i64::from(day.weekday().num_days_from_sunday()),
            Self::Monday => i64::from(day.weekday().num_days_from_monday()),
        }
    }
}

/// Inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Six weeks from the start of the week containing `today`.
    ///
    /// The last day is included in full, so the range spans 43 calendar days.
    pub fn six_weeks(today: NaiveDate, week_start: WeekStart) -> Self {
        let start = today - Duration::days(week_start.days_into_week(today));
        let end = start + Duration::weeks(WINDOW_WEEKS);
        Self { start, end }
    }

    /// True if an event spanning `[first, last]` touches the window.
    pub fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        first <= self.end && last >= self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_day_mapping() {
        assert_eq!(WeekStart::from_first_day(0), WeekStart::Sunday);
        assert_eq!(WeekStart::from_first_day(1), WeekStart::Monday);
        assert_eq!(WeekStart::from_first_day(6), WeekStart::Monday);
    }

    #[test]
    fn test_sunday_week() {
        // 2024-05-15 is a Wednesday
        let window = TimeWindow::six_weeks(day(2024, 5, 15), WeekStart::Sunday);
        assert_eq!(window.start, day(2024, 5, 12));
        assert_eq!(window.end, day(2024, 6, 23));
    }

    #[test]
    fn test_monday_week() {
        let window = TimeWindow::six_weeks(day(2024, 5, 15), WeekStart::Monday);
        assert_eq!(window.start, day(2024, 5, 13));
        assert_eq!(window.end, day(2024, 6, 24));
    }

    #[test]
    fn test_today_is_week_start() {
        let sunday = day(2024, 5, 12);
        assert_eq!(TimeWindow::six_weeks(sunday, WeekStart::Sunday).start, sunday);
        // Sunday is the last day of a Monday week
        assert_eq!(
            TimeWindow::six_weeks(sunday, WeekStart::Monday).start,
            day(2024, 5, 6)
        );
    }

    #[test]
    fn test_overlaps() {
        let window = TimeWindow::six_weeks(day(2024, 5, 15), WeekStart::Sunday);
        assert!(window.overlaps(day(2024, 5, 12), day(2024, 5, 12)));
        assert!(window.overlaps(day(2024, 5, 1), day(2024, 5, 12)));
        assert!(window.overlaps(day(2024, 6, 23), day(2024, 7, 1)));
        assert!(!window.overlaps(day(2024, 5, 1), day(2024, 5, 11)));
        assert!(!window.overlaps(day(2024, 6, 24), day(2024, 6, 25)));
    }
}
