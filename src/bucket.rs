//! Assigns flat workout and meal records to week windows and weekdays.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::dates::DisplayTz;
use crate::weeks::{ChallengePeriod, WeekWindow};

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// What a record contributes once it lands in a window.
#[derive(Debug, Clone, PartialEq)]
pub enum Measure {
    Cardio { points: f64, kind: Option<String> },
    Strength { sessions: u32 },
    Meal { slot: Option<String> },
}

/// When a record happened, as sent by the API.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordTime {
    /// A date or timestamp string.
    At(String),
    /// A server-side bucket with its own start and end.
    Range { start: String, end: String },
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub user_id: String,
    pub time: RecordTime,
    pub measure: Measure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucketed<'a> {
    /// Index into the window slice the bucketer was built with.
    pub window: usize,
    /// Effective calendar date; `None` for ranged records.
    pub date: Option<NaiveDate>,
    pub record: &'a RawRecord,
}

impl Bucketed<'_> {
    pub fn weekday(&self) -> Option<Weekday> {
        self.date.map(|d| d.weekday())
    }

    pub fn user_id(&self) -> &str {
        &self.record.user_id
    }
}

pub struct Bucketer<'w> {
    windows: &'w [WeekWindow],
    period: ChallengePeriod,
    tz: DisplayTz,
}

impl<'w> Bucketer<'w> {
    pub fn new(windows: &'w [WeekWindow], period: ChallengePeriod, tz: DisplayTz) -> Self {
        Self { windows, period, tz }
    }

    pub fn windows(&self) -> &'w [WeekWindow] {
        self.windows
    }

    /// Window holding `date`. Dates outside the challenge period (including the
    /// lead-in days of a Monday-aligned first window) belong to none.
    pub fn window_for_date(&self, date: NaiveDate) -> Option<usize> {
        if !self.period.contains(date) {
            return None;
        }
        let idx = self.windows.partition_point(|w| w.end < date);
        self.windows
            .get(idx)
            .filter(|w| w.contains(date))
            .map(|_| idx)
    }

    /// First window overlapping `[start, end]`. A range spanning two windows is
    /// only counted in the earlier one.
    pub fn window_for_range(&self, start: NaiveDate, end: NaiveDate) -> Option<usize> {
        if start > end || start > self.period.end || end < self.period.start {
            return None;
        }
        self.windows.iter().position(|w| w.overlaps(start, end))
    }

    pub fn place<'a>(&self, record: &'a RawRecord) -> Option<Bucketed<'a>> {
        match &record.time {
            RecordTime::At(raw) => {
                let date = self.tz.effective_date(raw)?;
                let window = self.window_for_date(date)?;
                Some(Bucketed {
                    window,
                    date: Some(date),
                    record,
                })
            }
            RecordTime::Range { start, end } => {
                let start = self.tz.effective_date(start)?;
                let end = self.tz.effective_date(end)?;
                let window = self.window_for_range(start, end)?;
                Some(Bucketed {
                    window,
                    date: None,
                    record,
                })
            }
            RecordTime::Missing => None,
        }
    }

    /// Places every record, dropping the ones with unusable or out-of-range dates.
    pub fn bucket<'a>(&self, records: &'a [RawRecord]) -> Vec<Bucketed<'a>> {
        let mut placed = Vec::with_capacity(records.len());
        let mut dropped = 0usize;

        for record in records {
            match self.place(record) {
                Some(b) => placed.push(b),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!(
                "🗓️ {} of {} records had no usable date in {}..{}",
                dropped,
                records.len(),
                self.period.start,
                self.period.end
            );
        }

        placed
    }
}

/// Splits one window's records into Mon..Sun buckets. Ranged records have no
/// single day and are skipped.
pub fn by_weekday<'b, 'a>(items: &'b [Bucketed<'a>]) -> [Vec<&'b Bucketed<'a>>; 7] {
    let mut days: [Vec<&'b Bucketed<'a>>; 7] = Default::default();
    for item in items {
        if let Some(day) = item.weekday() {
            days[day.num_days_from_monday() as usize].push(item);
        }
    }
    days
}
