//! Civil time helpers.
//!
//! Every comparison in the dashboard happens in one fixed civil timezone
//! (Central European time unless configured otherwise). These helpers pin
//! naive dates to instants in that zone and render the German date labels
//! shown on the dashboard pages.

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;

use crate::error::{EngineError, Result};

/// The civil timezone used when nothing else is configured.
pub const DEFAULT_CIVIL_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{s}'")))
}

/// Parse an RFC 3339 datetime string into `DateTime<Utc>`.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvalidDatetime(format!("'{s}': {e}")))
}

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::InvalidDatetime(format!("'{s}': {e}")))
}

/// Map a local wall-clock time onto an instant in `tz`.
///
/// Ambiguous times (autumn fold) resolve to the earlier instant. Times inside
/// a spring-forward gap are shifted forward by the length of the gap, so
/// 02:30 on the Berlin transition day becomes 03:30 CEST.
pub fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // Interpret with the offset in force before the gap.
            let before = tz.offset_from_utc_datetime(&(naive - TimeDelta::days(1)));
            let offset_secs = i64::from(before.fix().local_minus_utc());
            tz.from_utc_datetime(&(naive - TimeDelta::seconds(offset_secs)))
        }
    }
}

/// Midnight of `date` in `tz`.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    resolve_local(tz, date.and_time(chrono::NaiveTime::MIN))
}

fn weekday_abbrev_de(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mo.",
        Weekday::Tue => "Di.",
        Weekday::Wed => "Mi.",
        Weekday::Thu => "Do.",
        Weekday::Fri => "Fr.",
        Weekday::Sat => "Sa.",
        Weekday::Sun => "So.",
    }
}

/// `dd.MM.yyyy (EEE)`, e.g. `01.10.2023 (So.)`.
pub fn day_label(date: NaiveDate) -> String {
    format!(
        "{} ({})",
        date.format("%d.%m.%Y"),
        weekday_abbrev_de(date.weekday())
    )
}

/// `EEE, d.M.yyyy`, e.g. `So., 1.10.2023`.
pub fn short_day_label(date: NaiveDate) -> String {
    format!(
        "{}, {}.{}.{}",
        weekday_abbrev_de(date.weekday()),
        date.day(),
        date.month(),
        date.year()
    )
}
