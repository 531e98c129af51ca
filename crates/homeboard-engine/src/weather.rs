//! Weather forecast records and their German display helpers.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Current {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub uvi: f64,
    pub wind_speed: f64,
    pub wind_deg: Option<u16>,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl Current {
    pub fn wind_direction(&self) -> &'static str {
        self.wind_deg.map_or("", wind_direction)
    }

    pub fn uv_category(&self) -> &'static str {
        uv_category(self.uvi)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyTemperature {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Daily {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub moon_phase: f64,
    #[serde(default)]
    pub summary: String,
    pub temp: DailyTemperature,
    pub uvi: f64,
    pub wind_deg: Option<u16>,
    /// Probability of precipitation, 0 to 1.
    pub pop: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl Daily {
    pub fn moon_phase_label(&self) -> String {
        moon_phase_label(self.moon_phase)
    }
}

/// Current conditions plus the daily outlook.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast {
    pub current: Current,
    #[serde(default)]
    pub daily: Vec<Daily>,
}

/// Parse a one-call forecast response.
///
/// # Errors
///
/// Returns [`EngineError::Payload`] if the JSON does not match.
pub fn parse_forecast(json: &str) -> Result<Forecast> {
    Ok(serde_json::from_str(json)?)
}

/// Compass sector for a wind direction in degrees (`N`, `NO`, `O`, ...).
pub fn wind_direction(degrees: u16) -> &'static str {
    match f64::from(degrees) {
        d if d < 22.5 => "N",
        d if d < 67.5 => "NO",
        d if d < 112.5 => "O",
        d if d < 157.5 => "SO",
        d if d < 202.5 => "S",
        d if d < 247.5 => "SW",
        d if d < 292.5 => "W",
        d if d < 337.5 => "NW",
        _ => "N",
    }
}

/// Moon phase name with the phase in percent, e.g. `erstes Viertel (25 %)`.
///
/// `phase` runs from 0 (new moon) through 0.5 (full moon) back to 1.
pub fn moon_phase_label(phase: f64) -> String {
    let name = match phase {
        p if p < 0.025 => "Neumond",
        p if p < 0.225 => "zunehmende Sichel",
        p if p < 0.275 => "erstes Viertel",
        p if p < 0.475 => "zunehmender Halbmond",
        p if p < 0.525 => "Vollmond",
        p if p < 0.725 => "abnehmender Halbmond",
        p if p < 0.775 => "letztes Viertel",
        p if p < 0.975 => "abnehmende Sichel",
        _ => "Neumond",
    };
    format!("{name} ({:.0} %)", phase * 100.0)
}

pub fn uv_category(uv_index: f64) -> &'static str {
    match uv_index {
        u if u < 3.0 => "keine bis gering",
        u if u < 6.0 => "mittel",
        u if u < 8.0 => "hoch",
        u if u < 11.0 => "sehr hoch",
        _ => "extrem hoch",
    }
}

fn local(unix: i64, tz: &Tz) -> Result<DateTime<Tz>> {
    DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.with_timezone(tz))
        .ok_or_else(|| EngineError::InvalidDatetime(format!("unix time {unix} out of range")))
}

/// `HH:MM` of a Unix timestamp in `tz`.
pub fn local_time_label(unix: i64, tz: &Tz) -> Result<String> {
    Ok(local(unix, tz)?.format("%H:%M").to_string())
}

/// `dd.mm.yyyy HH:MM` of a Unix timestamp in `tz`.
pub fn local_timestamp_label(unix: i64, tz: &Tz) -> Result<String> {
    Ok(local(unix, tz)?.format("%d.%m.%Y %H:%M").to_string())
}
