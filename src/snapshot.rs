use chrono::NaiveDate;

use crate::aggregate::{aggregate_weeks, daily_breakdown, DayBreakdown, WeeklyTable};
use crate::bucket::{Bucketed, Bucketer, RawRecord};
use crate::dates::DisplayTz;
use crate::models::{ChallengeUser, ChartData};
use crate::present::{roster_table, sort_rows, RosterRow, SortSpec};
use crate::weeks::{current_week_index, find_week, generate_for_period, ChallengePeriod, WeekNumbering, WeekWindow};

/// One challenge's chart data with its week windows already generated.
#[derive(Debug, Clone)]
pub struct ChallengeSnapshot {
    pub users: Vec<ChallengeUser>,
    pub period: Option<ChallengePeriod>,
    pub windows: Vec<WeekWindow>,
    pub records: Vec<RawRecord>,
}

impl ChallengeSnapshot {
    pub fn from_chart(chart: ChartData, numbering: WeekNumbering) -> Self {
        let period = chart.period();
        let windows = period
            .as_ref()
            .map(|p| generate_for_period(p, numbering))
            .unwrap_or_default();
        let records = chart.records();

        Self {
            users: chart.users,
            period,
            windows,
            records,
        }
    }

    /// `None` without a challenge period; nothing can be bucketed then.
    pub fn bucketer(&self, tz: DisplayTz) -> Option<Bucketer<'_>> {
        self.period.map(|period| Bucketer::new(&self.windows, period, tz))
    }

    pub fn bucketed(&self, tz: DisplayTz) -> Vec<Bucketed<'_>> {
        match self.bucketer(tz) {
            Some(bucketer) => bucketer.bucket(&self.records),
            None => Vec::new(),
        }
    }

    pub fn table(&self, tz: DisplayTz) -> WeeklyTable {
        aggregate_weeks(&self.windows, &self.bucketed(tz))
    }

    pub fn roster(&self, tz: DisplayTz, as_of: NaiveDate, sparkline_weeks: usize, sort: SortSpec) -> Vec<RosterRow> {
        let table = self.table(tz);
        let mut rows = roster_table(&self.users, &self.windows, &table, as_of, sparkline_weeks);
        sort_rows(&mut rows, sort);
        rows
    }

    /// Day rows for window `index`. `None` when the index is out of range or there is no period.
    pub fn daily(&self, tz: DisplayTz, index: usize, user_id: &str) -> Option<Vec<DayBreakdown>> {
        let period = self.period.as_ref()?;
        let window = self.windows.get(index)?;
        Some(daily_breakdown(index, window, period, &self.bucketed(tz), user_id))
    }

    /// Explicit week number if given, otherwise the window containing `today`.
    /// `Err(n)` when week `n` does not exist.
    pub fn week_index(&self, week: Option<u32>, today: NaiveDate) -> Result<Option<usize>, u32> {
        match week {
            Some(n) => find_week(&self.windows, n).map(Some).ok_or(n),
            None => Ok(current_week_index(&self.windows, today)),
        }
    }
}
