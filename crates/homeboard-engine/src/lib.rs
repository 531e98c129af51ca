//! # homeboard-engine
//!
//! Deterministic logic behind a household dashboard.
//!
//! The engine expands recurring calendar events into concrete occurrences,
//! pairs them into displayable appointments, cleans up the school's
//! substitution plan, narrows the municipal waste schedule to what matters
//! this week, watches the citizens' office for free appointment slots, and
//! reads the sports fixtures, weather forecast and transit departures the
//! dashboard shows.
//! All functions take explicit inputs (including "today"); fetching data from
//! the outside world is left to the caller.
//!
//! ## Modules
//!
//! - [`rule`] — `RRULE` string → [`RecurrenceRule`]
//! - [`expander`] — rule + anchor + window → concrete occurrences
//! - [`civil`] — fixed civil timezone, DST-safe local times, German labels
//! - [`calendar`] — provider events → sorted appointment list
//! - [`substitution`] — substitution plan parsing and row merging
//! - [`waste`] — waste collection records and date filters
//! - [`booking`] — appointment booking page watch
//! - [`sports`] — football and handball fixture pages
//! - [`weather`] — forecast records, wind/moon/UV labels
//! - [`transit`] — departure monitor records
//! - [`config`] — layered settings
//! - [`error`] — Error types

pub mod booking;
pub mod calendar;
pub mod civil;
pub mod config;
pub mod error;
pub mod expander;
pub mod rule;
pub mod sports;
pub mod substitution;
pub mod transit;
pub mod waste;
pub mod weather;

pub use booking::{
    extract_location_summary, is_within_days, parse_next_slot, BookingPageSource, BookingWatch,
    NextSlot, Notifier, PollOutcome, PushMessage,
};
pub use calendar::{
    list_appointments, parse_events, window_for, Appointment, CalendarEvent, CalendarRef,
};
pub use civil::{parse_timezone, DEFAULT_CIVIL_TIMEZONE};
pub use config::{load_config, Settings};
pub use error::EngineError;
pub use expander::{
    expand, expand_event_spans, expand_event_time, expand_spans, expand_with_options, EventTime,
    ExpandOptions, Recurring,
};
pub use rule::{Frequency, RecurrenceRule};
pub use sports::{parse_football_games, parse_handball_games, FootballGame, HandballGame};
pub use substitution::{parse_plan, parse_plan_dates, SubstitutionEvent, SubstitutionPlan};
pub use transit::{parse_departures, Departure};
pub use waste::{Collection, WasteKind};
pub use weather::{parse_forecast, Forecast};
