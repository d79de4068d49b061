use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

/// Default display offset: records are stored in UTC and shown on a UTC+9 calendar.
pub const DEFAULT_OFFSET_HOURS: i32 = 9;

/// The calendar the dashboard buckets records into.
///
/// Timestamps are shifted into this fixed offset before their calendar date is
/// taken, so a record stored at `2024-01-07T16:00:00Z` lands on Monday the 8th.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTz(FixedOffset);

impl Default for DisplayTz {
    fn default() -> Self {
        Self::from_hours(DEFAULT_OFFSET_HOURS).unwrap_or_else(Self::utc)
    }
}

impl DisplayTz {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    /// `None` when the offset is outside ±23 hours.
    pub fn from_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(Self)
    }

    pub fn offset_hours(&self) -> i32 {
        self.0.local_minus_utc() / 3600
    }

    /// Calendar date a raw record string falls on in this timezone.
    ///
    /// Bare `YYYY-MM-DD` dates are already calendar days and are not shifted.
    /// Offset-carrying timestamps are converted; naive timestamps are taken as UTC.
    pub fn effective_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&self.0).date_naive());
        }

        // Postgres text output: "2024-01-05 15:00:00.123+00"
        for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
            if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
                return Some(ts.with_timezone(&self.0).date_naive());
            }
        }

        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(self.shift_utc(naive));
            }
        }

        None
    }

    /// "Today" on the display calendar.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.0).date_naive()
    }

    fn shift_utc(&self, naive: NaiveDateTime) -> NaiveDate {
        Utc.from_utc_datetime(&naive)
            .with_timezone(&self.0)
            .date_naive()
    }
}

/// Parses a calendar date that may be sent as a bare date or a full timestamp.
/// Only the leading `YYYY-MM-DD` is used; no timezone shift is applied.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
