//! Recurrence rule parsing.
//!
//! Calendar providers hand out recurrence as compact `RRULE` strings such as
//! `RRULE:FREQ=WEEKLY;INTERVAL=2;UNTIL=20250404T215959Z`. Only the subset the
//! dashboard expands is modelled: a frequency, an interval, an optional end
//! date and an optional occurrence count. Other keys (`BYDAY`, `WKST`, ...)
//! are accepted and ignored.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::civil::DEFAULT_CIVIL_TIMEZONE;
use crate::error::{EngineError, Result};

const RRULE_PREFIX: &str = "RRULE:";

/// The unit a series advances by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(EngineError::MalformedRule(format!(
                "unsupported FREQ '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed recurrence rule.
///
/// `end_date` is a civil date in the civil timezone and acts as an exclusive
/// ceiling: an occurrence landing on it is not generated. `count` caps the
/// whole series, counted from the first scheduled occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: NonZeroU32,
    pub end_date: Option<NaiveDate>,
    pub count: Option<NonZeroU32>,
}

impl RecurrenceRule {
    /// A rule with interval 1 and no limits.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: NonZeroU32::MIN,
            end_date: None,
            count: None,
        }
    }

    pub fn with_interval(mut self, interval: NonZeroU32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_count(mut self, count: NonZeroU32) -> Self {
        self.count = Some(count);
        self
    }

    /// Parse a rule string, converting `UNTIL` into a civil date in `tz`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedRule`] if `FREQ` is missing or not one
    /// of the four supported values, if `INTERVAL` or `COUNT` is not a
    /// positive integer, if `UNTIL` is not in `YYYYMMDDTHHMMSSZ` or
    /// `YYYYMMDD` form, or if a segment is not a `KEY=VALUE` pair.
    pub fn parse_with_timezone(s: &str, tz: &Tz) -> Result<Self> {
        let body = s.trim();
        let body = body.strip_prefix(RRULE_PREFIX).unwrap_or(body);

        let mut frequency = None;
        let mut interval = NonZeroU32::MIN;
        let mut end_date = None;
        let mut count = None;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                EngineError::MalformedRule(format!("expected KEY=VALUE, got '{part}'"))
            })?;
            let value = value.trim();
            match key.trim() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => interval = parse_positive("INTERVAL", value)?,
                "UNTIL" => end_date = Some(parse_until(value, tz)?),
                "COUNT" => count = Some(parse_positive("COUNT", value)?),
                _ => {}
            }
        }

        let frequency = frequency
            .ok_or_else(|| EngineError::MalformedRule(format!("missing FREQ in '{s}'")))?;

        Ok(Self {
            frequency,
            interval,
            end_date,
            count,
        })
    }
}

impl FromStr for RecurrenceRule {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_timezone(s, &DEFAULT_CIVIL_TIMEZONE)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={};INTERVAL={}", self.frequency, self.interval)?;
        if let Some(end) = self.end_date {
            write!(f, ";UNTIL={}", end.format("%Y%m%d"))?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }
        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<NonZeroU32> {
    value.parse::<NonZeroU32>().map_err(|_| {
        EngineError::MalformedRule(format!("{key} must be a positive integer, got '{value}'"))
    })
}

/// `UNTIL` is either a UTC timestamp or a bare date.
fn parse_until(value: &str, tz: &Tz) -> Result<NaiveDate> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ") {
        return Ok(Utc.from_utc_datetime(&naive).with_timezone(tz).date_naive());
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|_| EngineError::MalformedRule(format!("unreadable UNTIL '{value}'")))
}
