//! Sync window resolution and date index-key math
//!
//! The academic-calendar side of the product queries imported events by
//! day (`YYYY-MM-DD`), month (`YYYY-MM`) and April-start fiscal year.
//! All key enumeration here works on local calendar dates; callers
//! resolve timestamps to dates in the event's provider time zone first.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};

/// First month of the academic fiscal year (April).
pub const FISCAL_YEAR_START_MONTH: u32 = 4;

/// The time range a full (non-incremental) sync covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl SyncWindow {
    /// Months of history included in the default window.
    pub const MONTHS_BACK: u32 = 6;
    /// Months of future included in the default window.
    pub const MONTHS_AHEAD: u32 = 13;

    /// Default window around `now`: 00:00:00.000 on the first of the
    /// month six months back, through 23:59:59.999 on the last day of
    /// the month thirteen months ahead, both in `now`'s zone.
    pub fn around<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let first_of_month = first_of_month(now.date_naive());

        let start_date = first_of_month
            .checked_sub_months(Months::new(Self::MONTHS_BACK))
            .unwrap_or(first_of_month);
        let end_date = first_of_month
            .checked_add_months(Months::new(Self::MONTHS_AHEAD + 1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(first_of_month);

        Self {
            time_min: local_instant(&tz, start_date, NaiveTime::MIN),
            time_max: local_instant(&tz, end_date, end_of_day()),
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Resolve a wall-clock time in `tz` to a UTC instant. Ambiguous local
/// times (DST fold) take the earlier instant; nonexistent local times
/// (DST gap) fall back to the same wall clock read as UTC.
fn local_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let ndt = date.and_time(time);
    match tz.from_local_datetime(&ndt) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        chrono::LocalResult::None => Utc.from_utc_datetime(&ndt),
    }
}

/// Every local calendar date from `start` through `end` inclusive.
pub fn day_keys(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let end = end.max(start);
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect()
}

/// Every `YYYY-MM` from `start`'s month through `end`'s month inclusive.
pub fn month_keys(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let end = end.max(start);
    let mut keys = Vec::new();
    let mut cursor = first_of_month(start);
    let last = first_of_month(end);
    while cursor <= last {
        keys.push(cursor.format("%Y-%m").to_string());
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    keys
}

/// The April-start fiscal year a date belongs to.
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= FISCAL_YEAR_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Every distinct fiscal year touched by the span, in order.
pub fn fiscal_year_keys(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let end = end.max(start);
    let mut keys: Vec<String> = Vec::new();
    let mut cursor = first_of_month(start);
    let last = first_of_month(end);
    while cursor <= last {
        let key = fiscal_year(cursor).to_string();
        if keys.last() != Some(&key) {
            keys.push(key);
        }
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    keys
}
