//! Resolution of `list_events` time filters into a concrete window.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use super::request::{TimeFilter, parse_instant};
use crate::error::{CalendarError, CalendarResult};

/// Length of the listed working week, Monday through Friday.
const WORK_WEEK_DAYS: u64 = 5;

/// Half-open listing window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarResult<Self> {
        if start >= end {
            return Err(CalendarError::invalid("time_min must be before time_max"));
        }
        Ok(Self { start, end })
    }

    /// Parse an explicit RFC3339 range.
    pub fn parse(time_min: &str, time_max: &str) -> CalendarResult<Self> {
        let start = parse_instant("time_min", time_min)?;
        let end = parse_instant("time_max", time_max)?;
        Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
    }
}

/// Resolve a filter relative to `now`, with day boundaries taken in `tz`.
///
/// `today` is local midnight to the next midnight; `this_week` and
/// `next_week` run from Monday 00:00 to Saturday 00:00.
pub fn resolve(
    filter: TimeFilter,
    time_min: Option<&str>,
    time_max: Option<&str>,
    tz: Tz,
    now: DateTime<Utc>,
) -> CalendarResult<TimeWindow> {
    let today = now.with_timezone(&tz).date_naive();
    match filter {
        TimeFilter::Today => days_window(today, 1, tz),
        TimeFilter::ThisWeek => days_window(monday_of(today), WORK_WEEK_DAYS, tz),
        TimeFilter::NextWeek => {
            let monday = monday_of(today)
                .checked_add_days(Days::new(7))
                .ok_or_else(|| CalendarError::invalid("date out of range"))?;
            days_window(monday, WORK_WEEK_DAYS, tz)
        }
        TimeFilter::Custom => match (time_min, time_max) {
            (Some(min), Some(max)) => TimeWindow::parse(min, max),
            _ => Err(CalendarError::invalid(
                "time_filter 'custom' requires both time_min and time_max",
            )),
        },
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

fn days_window(first: NaiveDate, days: u64, tz: Tz) -> CalendarResult<TimeWindow> {
    let last = first
        .checked_add_days(Days::new(days))
        .ok_or_else(|| CalendarError::invalid("date out of range"))?;
    TimeWindow::new(local_midnight(first, tz)?, local_midnight(last, tz)?)
}

/// Start of `date` in `tz`. Where midnight falls in a DST gap, the first
/// valid instant after it is used.
fn local_midnight(date: NaiveDate, tz: Tz) -> CalendarResult<DateTime<Utc>> {
    (0..=2)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CalendarError::invalid(format!("no local midnight on {date} in {tz}")))
}
