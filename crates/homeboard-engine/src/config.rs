//! Dashboard configuration.
//!
//! Layered with the `config` crate: built-in defaults, then a TOML file
//! (`homeboard.toml` in the working directory, or an explicit path), then
//! `HOMEBOARD_*` environment variables using `__` between nested keys
//! (`HOMEBOARD_BOOKING__ACTIVE=true`). A `.env` file is loaded first when
//! present.

use std::collections::BTreeMap;
use std::path::Path;

use chrono_tz::Tz;
use config::Config;
use serde::Deserialize;

use crate::calendar::CalendarRef;
use crate::civil::parse_timezone;
use crate::error::Result;
use crate::expander::ExpandOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// IANA name of the civil timezone.
    pub timezone: String,
    #[serde(default)]
    pub calendar: CalendarSettings,
    #[serde(default)]
    pub substitution: SubstitutionSettings,
    #[serde(default)]
    pub waste: WasteSettings,
    #[serde(default)]
    pub booking: BookingSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub days_to_show: u32,
    /// Display name → provider calendar id.
    pub calendars: BTreeMap<String, String>,
}

impl CalendarSettings {
    /// The calendar configured under `name`; unknown names use the name as id.
    pub fn calendar_ref(&self, name: &str) -> CalendarRef {
        CalendarRef {
            id: self
                .calendars
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
            name: name.to_string(),
        }
    }
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            days_to_show: 14,
            calendars: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubstitutionSettings {
    /// Class whose rows are shown; empty shows the whole plan.
    pub class_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WasteSettings {
    pub month_limit: u32,
    pub alert_days: u32,
}

impl Default for WasteSettings {
    fn default() -> Self {
        Self {
            month_limit: 2,
            alert_days: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    pub search_timeframe_days: u32,
    /// Number of documents the booking is made for.
    pub documents: u32,
    /// Push device to target; all devices when unset.
    pub device: Option<String>,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            search_timeframe_days: 7,
            documents: 3,
            device: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Load from `homeboard.toml` (optional) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Config`] if a source cannot be read or
    /// the merged values do not deserialize.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an explicit configuration file, which must then exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Config`] if a source cannot be read or
    /// the merged values do not deserialize.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("homeboard").required(false),
        };

        Ok(Config::builder()
            .set_default("timezone", "Europe/Berlin")?
            .set_default("logging.level", "info")?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("HOMEBOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// The configured civil timezone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::InvalidTimezone`] for an unknown name.
    pub fn civil_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    pub fn expand_options(&self) -> Result<ExpandOptions> {
        Ok(ExpandOptions {
            civil_timezone: self.civil_timezone()?,
        })
    }
}

/// Load `.env` if present, then the layered settings.
///
/// # Errors
///
/// See [`Settings::load_from`].
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load_from(path)
}
