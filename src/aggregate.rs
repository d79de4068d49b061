//! Per-user, per-week reductions of bucketed records.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::bucket::{by_weekday, weekday_name, Bucketed, Measure, WEEKDAYS};
use crate::weeks::{monday_of, ChallengePeriod, WeekWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub week_number: u32,
    pub cardio_points: f64,
    pub strength_sessions: u32,
    pub meal_uploads: u32,
    /// Any record at all in this window.
    pub uploaded: bool,
}

impl WeeklyAggregate {
    pub fn empty(week_number: u32) -> Self {
        Self {
            week_number,
            cardio_points: 0.0,
            strength_sessions: 0,
            meal_uploads: 0,
            uploaded: false,
        }
    }

    pub fn add(&mut self, measure: &Measure) {
        match measure {
            Measure::Cardio { points, .. } => self.cardio_points += points,
            Measure::Strength { sessions } => self.strength_sessions += sessions,
            Measure::Meal { .. } => self.meal_uploads += 1,
        }
        self.uploaded = true;
    }
}

/// Aggregates for every user that has at least one bucketed record, one entry
/// per window. Users keep the order they were first seen in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeeklyTable {
    order: Vec<String>,
    rows: HashMap<String, Vec<WeeklyAggregate>>,
}

impl WeeklyTable {
    pub fn get(&self, user_id: &str) -> Option<&[WeeklyAggregate]> {
        self.rows.get(user_id).map(Vec::as_slice)
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Sum of cardio points over every user for one window.
    pub fn cardio_total(&self, window: usize) -> f64 {
        self.rows
            .values()
            .filter_map(|weeks| weeks.get(window))
            .map(|w| w.cardio_points)
            .sum()
    }
}

pub fn aggregate_weeks(windows: &[WeekWindow], bucketed: &[Bucketed<'_>]) -> WeeklyTable {
    let mut table = WeeklyTable::default();

    for item in bucketed {
        if item.window >= windows.len() {
            continue;
        }
        let user = item.user_id();
        if !table.rows.contains_key(user) {
            table.order.push(user.to_string());
            table.rows.insert(
                user.to_string(),
                windows.iter().map(|w| WeeklyAggregate::empty(w.week_number)).collect(),
            );
        }
        if let Some(weeks) = table.rows.get_mut(user) {
            weeks[item.window].add(&item.record.measure);
        }
    }

    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Complete,
    Incomplete,
    Rest,
    /// Before the challenge starts or after it ends.
    Outside,
}

impl DayStatus {
    /// Weekends are rest days whatever was logged.
    pub fn classify(day: Weekday, cardio_points: f64) -> Self {
        match day {
            Weekday::Sat | Weekday::Sun => DayStatus::Rest,
            _ if cardio_points > 0.0 => DayStatus::Complete,
            _ => DayStatus::Incomplete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBreakdown {
    pub weekday: &'static str,
    pub date: NaiveDate,
    pub cardio_points: f64,
    pub cardio_label: String,
    pub strength_sessions: u32,
    pub meal_uploads: u32,
    pub status: DayStatus,
}

/// Mon..Sun breakdown of one user's records inside `window`. Days of the
/// calendar week that fall outside `period` are marked `Outside`.
pub fn daily_breakdown(
    window_index: usize,
    window: &WeekWindow,
    period: &ChallengePeriod,
    bucketed: &[Bucketed<'_>],
    user_id: &str,
) -> Vec<DayBreakdown> {
    let mine: Vec<Bucketed<'_>> = bucketed
        .iter()
        .filter(|b| b.window == window_index && b.user_id() == user_id)
        .cloned()
        .collect();
    let days = by_weekday(&mine);
    let monday = monday_of(window.start);

    WEEKDAYS
        .iter()
        .zip(days.iter())
        .enumerate()
        .map(|(offset, (day, items))| {
            let mut totals = WeeklyAggregate::empty(window.week_number);
            for item in items {
                totals.add(&item.record.measure);
            }
            let date = monday + Duration::days(offset as i64);
            let status = if period.contains(date) {
                DayStatus::classify(*day, totals.cardio_points)
            } else {
                DayStatus::Outside
            };
            DayBreakdown {
                weekday: weekday_name(*day),
                date,
                cardio_points: totals.cardio_points,
                cardio_label: format_points(totals.cardio_points),
                strength_sessions: totals.strength_sessions,
                meal_uploads: totals.meal_uploads,
                status,
            }
        })
        .collect()
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn format_points(value: f64) -> String {
    format!("{:.1}", round1(value))
}

/// Bar/donut fill. The raw value is kept elsewhere for labels and sorting.
pub fn display_pct(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

/// `None` when the denominator is zero.
pub fn ratio_pct(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator * 100.0)
}

pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(pct) => format_points(pct),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Bucketer, RawRecord, RecordTime};
    use crate::dates::DisplayTz;
    use crate::weeks::{generate_for_period, ChallengePeriod, WeekNumbering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period() -> ChallengePeriod {
        ChallengePeriod::new(date(2024, 1, 3), date(2024, 1, 20))
    }

    fn record(user: &str, at: &str, measure: Measure) -> RawRecord {
        RawRecord {
            user_id: user.to_string(),
            time: RecordTime::At(at.to_string()),
            measure,
        }
    }

    fn cardio(points: f64) -> Measure {
        Measure::Cardio { points, kind: None }
    }

    #[test]
    fn test_same_day_cardio_points_are_summed() {
        let windows = generate_for_period(&period(), WeekNumbering::OneBased);
        let bucketer = Bucketer::new(&windows, period(), DisplayTz::default());
        let records = vec![
            record("u1", "2024-01-05", cardio(3.2)),
            record("u1", "2024-01-05", cardio(1.8)),
        ];
        let placed = bucketer.bucket(&records);
        let table = aggregate_weeks(&windows, &placed);

        let weeks = table.get("u1").unwrap();
        assert!((weeks[0].cardio_points - 5.0).abs() < 1e-9);
        assert_eq!(format_points(weeks[0].cardio_points), "5.0");
        assert!(weeks[0].uploaded);
        assert!(!weeks[1].uploaded);
    }

    #[test]
    fn test_strength_and_meals_are_counted() {
        let windows = generate_for_period(&period(), WeekNumbering::OneBased);
        let bucketer = Bucketer::new(&windows, period(), DisplayTz::default());
        let records = vec![
            record("u1", "2024-01-09", Measure::Strength { sessions: 1 }),
            record("u1", "2024-01-10", Measure::Strength { sessions: 1 }),
            record("u1", "2024-01-10", Measure::Meal { slot: Some("lunch".into()) }),
        ];
        let placed = bucketer.bucket(&records);
        let table = aggregate_weeks(&windows, &placed);

        let week = &table.get("u1").unwrap()[1];
        assert_eq!(week.strength_sessions, 2);
        assert_eq!(week.meal_uploads, 1);
        assert_eq!(week.cardio_points, 0.0);
        assert!(week.uploaded);
    }

    #[test]
    fn test_totals_are_conserved_across_windows() {
        let windows = generate_for_period(&period(), WeekNumbering::OneBased);
        let bucketer = Bucketer::new(&windows, period(), DisplayTz::default());

        let mut records = Vec::new();
        let mut in_range = 0.0;
        let mut day = date(2023, 12, 28);
        let mut points = 0.5;
        while day <= date(2024, 1, 25) {
            records.push(record("u1", &day.to_string(), cardio(points)));
            records.push(record("u2", &format!("{}T20:00:00Z", day), cardio(points)));
            if period().contains(day) {
                in_range += points;
            }
            // u2 is shifted a day forward by the display offset
            let shifted = day + Duration::days(1);
            if period().contains(shifted) {
                in_range += points;
            }
            points += 0.25;
            day += Duration::days(1);
        }

        let placed = bucketer.bucket(&records);
        let table = aggregate_weeks(&windows, &placed);
        let summed: f64 = (0..windows.len()).map(|w| table.cardio_total(w)).sum();

        assert!((summed - in_range).abs() < 1e-9);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let windows = generate_for_period(&period(), WeekNumbering::OneBased);
        let bucketer = Bucketer::new(&windows, period(), DisplayTz::default());
        let records = vec![
            record("u2", "2024-01-05", cardio(2.0)),
            record("u1", "2024-01-12", cardio(4.0)),
            record("u1", "2024-01-13", Measure::Strength { sessions: 1 }),
        ];
        let placed = bucketer.bucket(&records);

        let first = aggregate_weeks(&windows, &placed);
        let second = aggregate_weeks(&windows, &placed);
        assert_eq!(first, second);
        assert_eq!(first.users().collect::<Vec<_>>(), vec!["u2", "u1"]);
    }

    #[test]
    fn test_daily_breakdown_statuses() {
        let windows = generate_for_period(&period(), WeekNumbering::OneBased);
        let bucketer = Bucketer::new(&windows, period(), DisplayTz::default());
        let records = vec![
            record("u1", "2024-01-08", cardio(1.5)),
            record("u1", "2024-01-09", Measure::Strength { sessions: 1 }),
            record("u1", "2024-01-13", cardio(9.0)),
            record("u2", "2024-01-10", cardio(3.0)),
        ];
        let placed = bucketer.bucket(&records);
        let days = daily_breakdown(1, &windows[1], &period(), &placed, "u1");

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].weekday, "Mon");
        assert_eq!(days[0].date, date(2024, 1, 8));
        assert_eq!(days[0].status, DayStatus::Complete);
        assert_eq!(days[1].status, DayStatus::Incomplete);
        assert_eq!(days[1].strength_sessions, 1);
        // u2's Wednesday does not leak into u1
        assert_eq!(days[2].status, DayStatus::Incomplete);
        assert_eq!(days[5].status, DayStatus::Rest);
        assert_eq!(days[5].cardio_label, "9.0");
        assert_eq!(days[6].status, DayStatus::Rest);
    }

    #[test]
    fn test_daily_breakdown_marks_days_outside_the_period() {
        let windows = generate_for_period(&period(), WeekNumbering::OneBased);
        let bucketer = Bucketer::new(&windows, period(), DisplayTz::default());
        let records = vec![
            record("u1", "2024-01-02", cardio(5.0)),
            record("u1", "2024-01-03", cardio(1.0)),
            record("u1", "2024-01-19", cardio(2.0)),
        ];
        let placed = bucketer.bucket(&records);

        // lead-in: Jan 1 and 2 come before the Wednesday start
        let first = daily_breakdown(0, &windows[0], &period(), &placed, "u1");
        assert_eq!(first[0].date, date(2024, 1, 1));
        assert_eq!(first[0].status, DayStatus::Outside);
        assert_eq!(first[1].status, DayStatus::Outside);
        assert_eq!(first[1].cardio_points, 0.0);
        assert_eq!(first[2].status, DayStatus::Complete);
        assert_eq!(first[3].status, DayStatus::Incomplete);

        // tail: the last window ends on Saturday the 20th
        let last = daily_breakdown(2, &windows[2], &period(), &placed, "u1");
        assert_eq!(last[4].date, date(2024, 1, 19));
        assert_eq!(last[4].status, DayStatus::Complete);
        assert_eq!(last[5].date, date(2024, 1, 20));
        assert_eq!(last[5].status, DayStatus::Rest);
        assert_eq!(last[6].date, date(2024, 1, 21));
        assert_eq!(last[6].status, DayStatus::Outside);
        assert!(last.iter().all(|d| d.date <= windows[2].start + Duration::days(6)));
    }

    #[test]
    fn test_display_pct_clamps_but_label_keeps_raw() {
        assert_eq!(display_pct(134.7), 100.0);
        assert_eq!(display_pct(-3.0), 0.0);
        assert_eq!(display_pct(f64::NAN), 0.0);
        assert_eq!(format_points(134.7), "134.7");
    }

    #[test]
    fn test_ratio_guards_zero_denominator() {
        assert_eq!(ratio_pct(3.0, 0.0), None);
        assert_eq!(format_ratio(ratio_pct(3.0, 0.0)), "-");
        assert_eq!(format_ratio(ratio_pct(1.0, 4.0)), "25.0");
    }
}
