//! Calendar occurrence pairing.
//!
//! Raw provider events carry one start, one end and optionally an `RRULE`.
//! This module turns them into the flat, sorted appointment list the
//! calendar page renders: recurring events are expanded into the query window
//! (start series and end series separately, paired by position), whole-day
//! events get their exclusive end date pulled back by one day, and every entry
//! gets a German day label.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::civil::{day_label, parse_iso_date, parse_rfc3339, start_of_day};
use crate::error::{EngineError, Result};
use crate::expander::{expand_event_spans, EventTime, ExpandOptions};
use crate::rule::RecurrenceRule;

/// A calendar as configured for one household member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRef {
    pub id: String,
    pub name: String,
}

/// An event as fetched from the calendar provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub summary: String,
    pub start: EventTime,
    /// Exclusive end; for whole-day events this is the day after the last day.
    pub end: EventTime,
    /// Raw recurrence lines; only the first one is expanded.
    pub recurrence: Vec<String>,
}

impl CalendarEvent {
    pub fn is_recurring(&self) -> bool {
        !self.recurrence.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEventList {
    #[serde(default)]
    items: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    id: Option<String>,
    #[serde(default)]
    summary: String,
    start: RawEventTime,
    end: RawEventTime,
    #[serde(default)]
    recurrence: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

impl RawEventTime {
    fn resolve(&self, tz: &Tz) -> Result<EventTime> {
        match (&self.date_time, &self.date) {
            (Some(dt), _) => Ok(EventTime::DateTime(parse_rfc3339(dt)?.with_timezone(tz))),
            (None, Some(date)) => Ok(EventTime::Date(parse_iso_date(date)?)),
            (None, None) => Err(EngineError::Payload(
                "event time has neither 'date' nor 'dateTime'".to_string(),
            )),
        }
    }
}

/// Parse a provider event listing (`{"items": [...]}`) into events.
///
/// Timed boundaries are converted into `tz`.
///
/// # Errors
///
/// Returns [`EngineError::Payload`] for malformed JSON or a boundary without
/// a date, and [`EngineError::InvalidDatetime`] for unreadable values.
pub fn parse_events(json: &str, tz: &Tz) -> Result<Vec<CalendarEvent>> {
    let list: RawEventList = serde_json::from_str(json)?;
    list.items
        .into_iter()
        .map(|raw| {
            Ok(CalendarEvent {
                start: raw.start.resolve(tz)?,
                end: raw.end.resolve(tz)?,
                id: raw.id,
                summary: raw.summary,
                recurrence: raw.recurrence,
            })
        })
        .collect()
}

/// One displayed occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
    pub id: Option<String>,
    pub calendar_id: String,
    pub calendar_name: String,
    pub event_name: String,
    pub start: DateTime<Tz>,
    pub start_date: NaiveDate,
    pub start_time: String,
    pub end: DateTime<Tz>,
    pub end_date: NaiveDate,
    pub end_time: String,
    pub days_label: String,
    pub is_whole_day: bool,
    pub is_recurring: bool,
}

/// The `[today, today + days_to_show]` window the calendar page queries.
pub fn window_for(today: NaiveDate, days_to_show: u32) -> (NaiveDate, NaiveDate) {
    let end = today
        .checked_add_days(chrono::Days::new(u64::from(days_to_show)))
        .unwrap_or(NaiveDate::MAX);
    (today, end)
}

/// Build the sorted appointment list of `calendar` for the given window.
///
/// Events whose recurrence rule cannot be parsed, or whose start and end are
/// of different kinds, are logged and left out rather than failing the page.
pub fn list_appointments(
    calendar: &CalendarRef,
    events: &[CalendarEvent],
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<Appointment> {
    let tz = options.civil_timezone;
    let mut appointments = Vec::new();

    for event in events {
        if event.start.is_whole_day() != event.end.is_whole_day() {
            tracing::warn!(
                calendar = %calendar.name,
                event = %event.summary,
                "skipping event mixing whole-day and timed boundaries"
            );
            continue;
        }

        let pairs: Vec<(EventTime, EventTime)> = match event.recurrence.first() {
            None => vec![(event.start, event.end)],
            Some(raw) => match RecurrenceRule::parse_with_timezone(raw, &tz) {
                Ok(rule) => expand_event_spans(
                    &rule,
                    event.start,
                    event.end,
                    window_start,
                    window_end,
                    options,
                )
                .unwrap_or_default(),
                Err(err) => {
                    tracing::warn!(
                        calendar = %calendar.name,
                        event = %event.summary,
                        error = %err,
                        "skipping event with unreadable recurrence"
                    );
                    continue;
                }
            },
        };

        appointments.extend(
            pairs
                .into_iter()
                .filter_map(|(start, end)| to_appointment(calendar, event, start, end, &tz)),
        );
    }

    appointments.sort_by_key(|a| a.start);
    tracing::debug!(
        calendar = %calendar.name,
        count = appointments.len(),
        "listed appointments"
    );
    appointments
}

fn to_appointment(
    calendar: &CalendarRef,
    event: &CalendarEvent,
    start: EventTime,
    end: EventTime,
    tz: &Tz,
) -> Option<Appointment> {
    let (start, end, first_day, last_day, is_whole_day) = match (start, end) {
        (EventTime::Date(first), EventTime::Date(exclusive_end)) => {
            let last = exclusive_end.pred_opt().unwrap_or(exclusive_end).max(first);
            (start_of_day(first, tz), start_of_day(last, tz), first, last, true)
        }
        (EventTime::DateTime(s), EventTime::DateTime(e)) => {
            let s = s.with_timezone(tz);
            let e = e.with_timezone(tz);
            (s, e, s.date_naive(), e.date_naive(), false)
        }
        _ => return None,
    };

    let first_label = day_label(first_day);
    let last_label = day_label(last_day);
    let days_label = if first_label == last_label {
        first_label
    } else {
        format!("{first_label} - {last_label}")
    };

    Some(Appointment {
        id: event.id.clone(),
        calendar_id: calendar.id.clone(),
        calendar_name: calendar.name.clone(),
        event_name: event.summary.clone(),
        start,
        start_date: start.date_naive(),
        start_time: start.format("%H:%M").to_string(),
        end,
        end_date: end.date_naive(),
        end_time: end.format("%H:%M").to_string(),
        days_label,
        is_whole_day,
        is_recurring: event.is_recurring(),
    })
}
