//! View models for the roster table, sparklines, donut, leaderboard and batch
//! detail panels.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    aggregate_weeks, display_pct, format_points, format_ratio, ratio_pct, round1, WeeklyAggregate,
    WeeklyTable,
};
use crate::bucket::{Bucketed, Bucketer, Measure, RawRecord};
use crate::models::{ChallengeUser, LeaderboardEntry, UserWeeklyDetail};
use crate::weeks::WeekWindow;

pub const EMPTY_MARKER: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeekCell {
    /// No records for this user in the window yet.
    Empty { week_number: u32, label: &'static str },
    Filled {
        week_number: u32,
        cardio_points: f64,
        label: String,
        bar_pct: f64,
        strength_sessions: u32,
        meal_uploads: u32,
        uploaded: bool,
    },
}

impl WeekCell {
    pub fn from_aggregate(agg: &WeeklyAggregate) -> Self {
        if !agg.uploaded {
            return WeekCell::empty(agg.week_number);
        }
        WeekCell::Filled {
            week_number: agg.week_number,
            cardio_points: agg.cardio_points,
            label: format_points(agg.cardio_points),
            bar_pct: display_pct(agg.cardio_points),
            strength_sessions: agg.strength_sessions,
            meal_uploads: agg.meal_uploads,
            uploaded: agg.uploaded,
        }
    }

    pub fn empty(week_number: u32) -> Self {
        WeekCell::Empty {
            week_number,
            label: EMPTY_MARKER,
        }
    }

    pub fn week_number(&self) -> u32 {
        match self {
            WeekCell::Empty { week_number, .. } | WeekCell::Filled { week_number, .. } => *week_number,
        }
    }

    /// Raw cardio value, 0 for empty cells.
    pub fn cardio_points(&self) -> f64 {
        match self {
            WeekCell::Empty { .. } => 0.0,
            WeekCell::Filled { cardio_points, .. } => *cardio_points,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            WeekCell::Empty { label, .. } => *label,
            WeekCell::Filled { label, .. } => label.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparkPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub user_id: String,
    pub name: Option<String>,
    pub cells: Vec<WeekCell>,
    pub total_points: f64,
    pub total_label: String,
    pub sparkline: Vec<SparkPoint>,
}

impl RosterRow {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }

    pub fn week_value(&self, week_number: u32) -> f64 {
        self.cells
            .iter()
            .find(|c| c.week_number() == week_number)
            .map(WeekCell::cardio_points)
            .unwrap_or(0.0)
    }
}

fn cells_for(windows: &[WeekWindow], weeks: Option<&[WeeklyAggregate]>) -> Vec<WeekCell> {
    windows
        .iter()
        .enumerate()
        .map(|(i, w)| match weeks.and_then(|weeks| weeks.get(i)) {
            Some(agg) => WeekCell::from_aggregate(agg),
            None => WeekCell::empty(w.week_number),
        })
        .collect()
}

/// Cardio values of the most recent `n` windows that have started by `as_of`.
pub fn sparkline(cells: &[WeekCell], windows: &[WeekWindow], as_of: NaiveDate, n: usize) -> Vec<SparkPoint> {
    let started = windows.iter().take_while(|w| w.start <= as_of).count();
    let from = started.saturating_sub(n);

    windows
        .iter()
        .zip(cells.iter())
        .take(started)
        .skip(from)
        .map(|(w, c)| SparkPoint {
            label: w.label.clone(),
            value: c.cardio_points(),
        })
        .collect()
}

/// One wide row per user. Listed users come first in fetch order, then anyone
/// who only shows up in the records.
pub fn roster_table(
    users: &[ChallengeUser],
    windows: &[WeekWindow],
    table: &WeeklyTable,
    as_of: NaiveDate,
    sparkline_weeks: usize,
) -> Vec<RosterRow> {
    let listed = users.iter().map(|u| (u.id.as_str(), u.name.clone()));
    let unlisted = table
        .users()
        .filter(|id| !users.iter().any(|u| u.id == *id))
        .map(|id| (id, None));

    listed
        .chain(unlisted)
        .map(|(user_id, name)| {
            let weeks = table.get(user_id);
            let cells = cells_for(windows, weeks);
            let total_points: f64 = cells.iter().map(WeekCell::cardio_points).sum();
            let sparkline = sparkline(&cells, windows, as_of, sparkline_weeks);
            RosterRow {
                user_id: user_id.to_string(),
                name,
                cells,
                total_points,
                total_label: format_points(total_points),
                sparkline,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "week", rename_all = "snake_case")]
pub enum SortKey {
    UserId,
    Name,
    Week(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn flip(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub dir: SortDir,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            dir: SortDir::Asc,
        }
    }
}

impl SortKey {
    /// `user_id`, `name`, or `week:N` / `weekN`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim().to_lowercase();
        match raw.as_str() {
            "user_id" | "userid" | "id" => return Ok(SortKey::UserId),
            "name" => return Ok(SortKey::Name),
            _ => {}
        }
        raw.strip_prefix("week")
            .map(|rest| rest.trim_start_matches([':', '_', '-']))
            .and_then(|n| n.parse::<u32>().ok())
            .map(SortKey::Week)
            .ok_or_else(|| format!("unknown sort key '{}'", raw))
    }
}

impl SortDir {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

impl SortSpec {
    pub fn parse(key: Option<&str>, dir: Option<&str>) -> Result<Self, String> {
        let mut spec = SortSpec::default();
        if let Some(key) = key {
            spec.key = SortKey::parse(key)?;
        }
        if let Some(dir) = dir {
            spec.dir = SortDir::parse(dir)?;
        }
        Ok(spec)
    }
}

/// Stable sort; rows that compare equal keep their fetch order in both directions.
pub fn sort_rows(rows: &mut [RosterRow], spec: SortSpec) {
    let compare = |a: &RosterRow, b: &RosterRow| -> Ordering {
        match spec.key {
            SortKey::UserId => a.user_id.cmp(&b.user_id),
            SortKey::Name => a
                .display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase()),
            SortKey::Week(n) => a.week_value(n).total_cmp(&b.week_value(n)),
        }
    };

    match spec.dir {
        SortDir::Asc => rows.sort_by(compare),
        SortDir::Desc => rows.sort_by(|a, b| compare(b, a)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonutSlice {
    pub category: String,
    pub value: f64,
    pub label: String,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Donut {
    Empty {
        week_number: u32,
    },
    Filled {
        week_number: u32,
        total: f64,
        total_label: String,
        display_pct: f64,
        slices: Vec<DonutSlice>,
    },
}

/// Cardio points for one window split by workout kind.
pub fn donut(window_index: usize, window: &WeekWindow, bucketed: &[Bucketed<'_>], user_id: Option<&str>) -> Donut {
    let mut by_kind: BTreeMap<String, f64> = BTreeMap::new();

    let in_scope = bucketed
        .iter()
        .filter(|b| b.window == window_index)
        .filter(|b| user_id.map_or(true, |u| b.user_id() == u));
    for item in in_scope {
        if let Measure::Cardio { points, kind } = &item.record.measure {
            let kind = kind
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .unwrap_or("cardio")
                .to_lowercase();
            *by_kind.entry(kind).or_insert(0.0) += points;
        }
    }

    let total: f64 = by_kind.values().sum();
    if total <= 0.0 {
        return Donut::Empty {
            week_number: window.week_number,
        };
    }

    let slices = by_kind
        .into_iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(category, value)| DonutSlice {
            category,
            value,
            label: format_points(value),
            share_pct: round1(value / total * 100.0),
        })
        .collect();

    Donut::Filled {
        week_number: window.week_number,
        total,
        total_label: format_points(total),
        display_pct: display_pct(total),
        slices,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub user_id: String,
    pub name: Option<String>,
    pub points: f64,
    pub label: String,
}

/// Highest points first; equal points share a rank (1, 1, 3).
pub fn leaderboard(entries: &[LeaderboardEntry], users: &[ChallengeUser]) -> Vec<LeaderboardRow> {
    let mut ordered: Vec<(&str, f64)> = entries
        .iter()
        .map(|e| (e.user_id.as_str(), e.points.unwrap_or(0.0)))
        .collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut rows: Vec<LeaderboardRow> = Vec::with_capacity(ordered.len());
    for (i, (user_id, points)) in ordered.into_iter().enumerate() {
        let rank = match rows.last() {
            Some(prev) if prev.points == points => prev.rank,
            _ => i as u32 + 1,
        };
        rows.push(LeaderboardRow {
            rank,
            user_id: user_id.to_string(),
            name: users.iter().find(|u| u.id == user_id).and_then(|u| u.name.clone()),
            points,
            label: format_points(points),
        });
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participation {
    pub today_count: u64,
    pub total_participants: Option<usize>,
    pub rate_label: String,
}

pub fn participation(today_count: u64, total_participants: Option<usize>) -> Participation {
    let ratio = total_participants.and_then(|total| ratio_pct(today_count as f64, total as f64));
    Participation {
        today_count,
        total_participants,
        rate_label: format_ratio(ratio),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub user_id: String,
    pub weeks: Vec<WeekCell>,
}

/// Re-buckets the server's per-user weekly totals into local windows.
pub fn batch_rows(details: &[UserWeeklyDetail], bucketer: &Bucketer<'_>) -> Vec<BatchRow> {
    let records: Vec<RawRecord> = details.iter().flat_map(UserWeeklyDetail::records).collect();
    let placed = bucketer.bucket(&records);
    let table = aggregate_weeks(bucketer.windows(), &placed);

    details
        .iter()
        .map(|d| BatchRow {
            user_id: d.user_id.clone(),
            weeks: cells_for(bucketer.windows(), table.get(&d.user_id)),
        })
        .collect()
}
