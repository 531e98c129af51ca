//! Departure monitor records from the local transit operator's API.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDepartureList {
    #[serde(default)]
    departure_list: Option<Vec<RawDeparture>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeparture {
    #[serde(default)]
    platform: String,
    serving_line: RawServingLine,
    date_time: RawDateTime,
    real_date_time: Option<RawDateTime>,
}

#[derive(Deserialize)]
struct RawServingLine {
    number: String,
    direction: String,
}

/// The API sends every component as a string.
#[derive(Deserialize)]
struct RawDateTime {
    year: String,
    month: String,
    day: String,
    hour: String,
    minute: String,
}

impl RawDateTime {
    fn to_naive(&self) -> Result<NaiveDateTime> {
        fn number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| EngineError::Payload(format!("departure {field} '{value}'")))
        }

        let date = NaiveDate::from_ymd_opt(
            number("year", &self.year)?,
            number("month", &self.month)?,
            number("day", &self.day)?,
        );
        let time = NaiveTime::from_hms_opt(
            number("hour", &self.hour)?,
            number("minute", &self.minute)?,
            0,
        );
        match (date, time) {
            (Some(date), Some(time)) => Ok(date.and_time(time)),
            _ => Err(EngineError::InvalidDatetime(format!(
                "departure {}-{}-{} {}:{}",
                self.year, self.month, self.day, self.hour, self.minute
            ))),
        }
    }
}

/// One departure from a stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Departure {
    pub line: String,
    pub direction: String,
    pub platform: String,
    pub planned: NaiveDateTime,
    /// Minutes behind schedule; zero without live data.
    pub delay_minutes: i64,
}

impl Departure {
    /// Planned departure as `HH:MM`.
    pub fn departure_time(&self) -> String {
        self.planned.format("%H:%M").to_string()
    }
}

/// Parse a departure monitor response.
///
/// A response without a departure list (the API sends `null` when nothing
/// runs) yields no departures.
///
/// # Errors
///
/// Returns [`EngineError::Payload`] if the JSON does not match or a time
/// component is not a number.
pub fn parse_departures(json: &str) -> Result<Vec<Departure>> {
    let raw: RawDepartureList = serde_json::from_str(json)?;
    raw.departure_list
        .unwrap_or_default()
        .into_iter()
        .map(|d| {
            let planned = d.date_time.to_naive()?;
            let delay_minutes = match &d.real_date_time {
                Some(real) => (real.to_naive()? - planned).num_minutes(),
                None => 0,
            };
            Ok(Departure {
                line: d.serving_line.number,
                direction: d.serving_line.direction,
                platform: d.platform,
                planned,
                delay_minutes,
            })
        })
        .collect()
}
