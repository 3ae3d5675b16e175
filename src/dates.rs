//! Local-time helpers shared by the store, the filters and the views.
//!
//! Every timestamp in the system is epoch milliseconds. "Local" always means
//! the configured [`Tz`], never the host clock's zone.

use chrono::{DateTime, Datelike, Days, LocalResult, Months, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Inclusive millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Millis,
    pub end: Millis,
}

impl Window {
    pub fn contains(&self, ms: Millis) -> bool {
        ms >= self.start && ms <= self.end
    }
}

pub fn local_datetime(ms: Millis, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(ms).single()
}

pub fn local_date(ms: Millis, tz: &Tz) -> Option<NaiveDate> {
    local_datetime(ms, tz).map(|dt| dt.date_naive())
}

/// First instant of `date` in `tz`.
///
/// When a DST transition skips midnight the day starts at the first valid
/// local time after it.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(midnight + TimeDelta::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&midnight)),
    }
}

/// Last millisecond of `date` in `tz` (23:59:59.999 local).
pub fn end_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    start_of_day(date + Days::new(1), tz) - TimeDelta::milliseconds(1)
}

/// Drops the time-of-day component of `ms`, keeping the local calendar date.
/// `None` when `ms` is outside the representable date range.
pub fn normalize_to_midnight(ms: Millis, tz: &Tz) -> Option<Millis> {
    local_date(ms, tz).map(|date| start_of_day(date, tz).timestamp_millis())
}

pub fn today_midnight(now: &DateTime<Tz>) -> Millis {
    start_of_day(now.date_naive(), &now.timezone()).timestamp_millis()
}

/// Monday 00:00:00.000 through Sunday 23:59:59.999 of the week containing `now`.
pub fn week_window(now: &DateTime<Tz>) -> Window {
    let tz = now.timezone();
    let today = now.date_naive();
    let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let sunday = monday + Days::new(6);
    Window {
        start: start_of_day(monday, &tz).timestamp_millis(),
        end: end_of_day(sunday, &tz).timestamp_millis(),
    }
}

/// First-of-month 00:00:00.000 through last-of-month 23:59:59.999.
pub fn month_window(now: &DateTime<Tz>) -> Window {
    let tz = now.timezone();
    let first = first_of_month(now.date_naive());
    let last = last_of_month(first);
    Window {
        start: start_of_day(first, &tz).timestamp_millis(),
        end: end_of_day(last, &tz).timestamp_millis(),
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) + Months::new(1) - Days::new(1)
}

/// `YYYY-MM-DD` in local time; empty when the timestamp is out of range.
pub fn format_date(ms: Millis, tz: &Tz) -> String {
    local_datetime(ms, tz)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// `YYYY-MM-DD HH:MM` on a 24-hour clock.
pub fn format_date_time(ms: Millis, tz: &Tz) -> String {
    local_datetime(ms, tz)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
