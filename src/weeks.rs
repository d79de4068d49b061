//! Week windows for a challenge.
//!
//! Windows are always Monday-aligned. The first window may start before the
//! challenge does and the last one is cut short at the challenge end date.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::parse_calendar_date;

/// Inclusive calendar range a challenge runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChallengePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ChallengePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `None` when either side is missing or malformed.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Option<Self> {
        let start = parse_calendar_date(start?)?;
        let end = parse_calendar_date(end?)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// How weeks are numbered when the challenge does not start on a Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekNumbering {
    /// First window is week 1, partial or not.
    #[default]
    OneBased,
    /// A partial lead-in window is week 0; the first full Monday window is week 1.
    LeadInZero,
}

impl WeekNumbering {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "one_based" | "one-based" | "1" => Some(Self::OneBased),
            "lead_in_zero" | "lead-in-zero" | "0" => Some(Self::LeadInZero),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub week_number: u32,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Monday of the calendar week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn format_label(start: NaiveDate, end: NaiveDate) -> String {
    format!("{}-{}", start.format("%m.%d"), end.format("%m.%d"))
}

/// Builds the ordered week windows covering `[start, end]`.
pub fn generate_weeks(start: NaiveDate, end: NaiveDate, numbering: WeekNumbering) -> Vec<WeekWindow> {
    if start > end {
        return Vec::new();
    }

    let first_number = match numbering {
        WeekNumbering::LeadInZero if start.weekday().num_days_from_monday() != 0 => 0,
        _ => 1,
    };

    let mut weeks = Vec::new();
    let mut window_start = monday_of(start);
    let mut number = first_number;

    while window_start <= end {
        let window_end = (window_start + Duration::days(6)).min(end);
        weeks.push(WeekWindow {
            week_number: number,
            label: format_label(window_start, window_end),
            start: window_start,
            end: window_end,
        });
        window_start += Duration::days(7);
        number += 1;
    }

    weeks
}

pub fn generate_for_period(period: &ChallengePeriod, numbering: WeekNumbering) -> Vec<WeekWindow> {
    generate_weeks(period.start, period.end, numbering)
}

/// Index of the window containing `today`, falling back to the last window once
/// the challenge is over and the first one before it starts.
pub fn current_week_index(windows: &[WeekWindow], today: NaiveDate) -> Option<usize> {
    let first = windows.first()?;
    let last = windows.last()?;
    if today < first.start {
        return Some(0);
    }
    if today > last.end {
        return Some(windows.len() - 1);
    }
    windows.iter().position(|w| w.contains(today))
}

pub fn find_week(windows: &[WeekWindow], week_number: u32) -> Option<usize> {
    windows.iter().position(|w| w.week_number == week_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_wednesday_start_aligns_to_monday_and_truncates_end() {
        let weeks = generate_weeks(date(2024, 1, 3), date(2024, 1, 20), WeekNumbering::OneBased);

        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].start, date(2024, 1, 1));
        assert_eq!(weeks[0].end, date(2024, 1, 7));
        assert_eq!(weeks[0].label, "01.01-01.07");
        assert_eq!(weeks[2].start, date(2024, 1, 15));
        assert_eq!(weeks[2].end, date(2024, 1, 20));
        assert_eq!(weeks[2].days(), 6);
        assert_eq!(weeks[2].label, "01.15-01.20");
        assert_eq!(
            weeks.iter().map(|w| w.week_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_lead_in_zero_numbering() {
        let weeks = generate_weeks(date(2024, 1, 3), date(2024, 1, 20), WeekNumbering::LeadInZero);
        assert_eq!(
            weeks.iter().map(|w| w.week_number).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        // A Monday start has no lead-in week
        let weeks = generate_weeks(date(2024, 1, 1), date(2024, 1, 14), WeekNumbering::LeadInZero);
        assert_eq!(weeks[0].week_number, 1);
    }

    #[test]
    fn test_start_after_end_is_empty() {
        assert!(generate_weeks(date(2024, 2, 1), date(2024, 1, 1), WeekNumbering::OneBased).is_empty());
    }

    #[test]
    fn test_single_day_challenge() {
        let weeks = generate_weeks(date(2024, 1, 7), date(2024, 1, 7), WeekNumbering::OneBased);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].start, date(2024, 1, 1));
        assert_eq!(weeks[0].end, date(2024, 1, 7));
    }

    #[test]
    fn test_windows_are_contiguous_and_cover_the_period() {
        let starts = [date(2024, 1, 1), date(2024, 2, 29), date(2023, 12, 31), date(2024, 6, 15)];
        for start in starts {
            for len in 0..60 {
                let end = start + Duration::days(len);
                let weeks = generate_weeks(start, end, WeekNumbering::OneBased);

                assert!(weeks[0].start <= start);
                assert_eq!(weeks[0].start.weekday(), Weekday::Mon);
                assert_eq!(weeks.last().unwrap().end, end);

                for pair in weeks.windows(2) {
                    assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
                    assert_eq!(pair[0].days(), 7);
                    assert_eq!(pair[1].week_number, pair[0].week_number + 1);
                }

                // every day of the period sits in exactly one window
                let mut day = start;
                while day <= end {
                    assert_eq!(weeks.iter().filter(|w| w.contains(day)).count(), 1);
                    day += Duration::days(1);
                }
            }
        }
    }

    #[test]
    fn test_current_week_index() {
        let weeks = generate_weeks(date(2024, 1, 3), date(2024, 1, 20), WeekNumbering::OneBased);
        assert_eq!(current_week_index(&weeks, date(2024, 1, 10)), Some(1));
        assert_eq!(current_week_index(&weeks, date(2023, 12, 1)), Some(0));
        assert_eq!(current_week_index(&weeks, date(2024, 3, 1)), Some(2));
        assert_eq!(current_week_index(&[], date(2024, 3, 1)), None);
    }

    #[test]
    fn test_period_parse() {
        let period = ChallengePeriod::parse(Some("2024-01-03"), Some("2024-01-20T00:00:00Z")).unwrap();
        assert_eq!(period.start, date(2024, 1, 3));
        assert_eq!(period.end, date(2024, 1, 20));
        assert!(ChallengePeriod::parse(None, Some("2024-01-20")).is_none());
        assert!(ChallengePeriod::parse(Some("soon"), Some("2024-01-20")).is_none());
    }

    #[test]
    fn test_numbering_parse() {
        assert_eq!(WeekNumbering::parse("lead_in_zero"), Some(WeekNumbering::LeadInZero));
        assert_eq!(WeekNumbering::parse("ONE_BASED"), Some(WeekNumbering::OneBased));
        assert_eq!(WeekNumbering::parse("two"), None);
    }
}
