//! School substitution plan.
//!
//! The school publishes one plan per day as JSON. Rows arrive with list-valued
//! classes and lessons, empty strings for absent values and a two-element
//! `texts` array holding the comment and a cancellation marker. Rows whose
//! lesson is `0` carry no lesson of their own; they continue the comment of
//! the row before them and are folded into it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::civil::short_day_label;
use crate::error::{EngineError, Result};

const ORPHAN_LESSON: &str = "0";
const CANCELED_MARKER: &str = "x";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    date: NaiveDate,
    version: String,
    #[serde(default)]
    infos: Vec<String>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    classes: Vec<String>,
    lessons: Vec<serde_json::Value>,
    #[serde(default)]
    previous_subject: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    previous_room: String,
    #[serde(default)]
    room: String,
    #[serde(default)]
    previous_teacher: String,
    #[serde(default)]
    teacher: String,
    texts: (String, String),
}

/// One row of the substitution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionEvent {
    /// Affected classes, joined by `", "`.
    pub classes: String,
    /// Affected lessons, joined by `", "`.
    pub lessons: String,
    pub previous_subject: Option<String>,
    pub subject: Option<String>,
    pub previous_room: Option<String>,
    pub room: Option<String>,
    pub previous_teacher: Option<String>,
    pub teacher: Option<String>,
    pub comment: String,
    pub canceled: bool,
}

impl SubstitutionEvent {
    fn is_orphan(&self) -> bool {
        self.lessons == ORPHAN_LESSON
    }
}

/// The plan for one school day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionPlan {
    pub date: NaiveDate,
    pub updated_at: NaiveDateTime,
    pub infos: Vec<String>,
    pub events: Vec<SubstitutionEvent>,
}

impl SubstitutionPlan {
    /// Only the rows affecting `class` (substring match, so `5b` finds `5a, 5b`).
    pub fn for_class(&self, class: &str) -> SubstitutionPlan {
        SubstitutionPlan {
            date: self.date,
            updated_at: self.updated_at,
            infos: self.infos.clone(),
            events: self
                .events
                .iter()
                .filter(|e| e.classes.contains(class))
                .cloned()
                .collect(),
        }
    }

    /// `EEE, d.M.yyyy` in German.
    pub fn date_label(&self) -> String {
        short_day_label(self.date)
    }

    /// `dd.mm.yyyy HH:MM:SS`.
    pub fn updated_label(&self) -> String {
        self.updated_at.format("%d.%m.%Y %H:%M:%S").to_string()
    }
}

/// Parse the list of days for which a plan exists.
pub fn parse_plan_dates(json: &str) -> Result<Vec<NaiveDate>> {
    let dates: Vec<NaiveDate> = serde_json::from_str(json)?;
    tracing::info!(count = dates.len(), "read substitution plan dates");
    Ok(dates)
}

/// Parse one day's plan and fold orphaned comment rows into their predecessors.
pub fn parse_plan(json: &str) -> Result<SubstitutionPlan> {
    let raw: RawPlan = serde_json::from_str(json)?;
    let updated_at = parse_version(&raw.version)?;
    let events = merge_orphan_rows(raw.events.into_iter().map(convert_event).collect());
    tracing::info!(date = %raw.date, rows = events.len(), "read substitution plan");

    Ok(SubstitutionPlan {
        date: raw.date,
        updated_at,
        infos: raw.infos,
        events,
    })
}

/// Fold every row whose lessons are exactly `0` into the closest preceding
/// regular row. A leading orphan has nothing to attach to and is kept.
pub fn merge_orphan_rows(events: Vec<SubstitutionEvent>) -> Vec<SubstitutionEvent> {
    let mut merged: Vec<SubstitutionEvent> = Vec::with_capacity(events.len());
    for event in events {
        match merged.last_mut() {
            Some(previous) if event.is_orphan() => {
                tracing::debug!(comment = %event.comment, "merging orphaned plan row");
                previous.comment.push(' ');
                previous.comment.push_str(&event.comment);
            }
            _ => merged.push(event),
        }
    }
    merged
}

fn convert_event(raw: RawEvent) -> SubstitutionEvent {
    let (comment, canceled) = raw.texts;
    SubstitutionEvent {
        classes: raw
            .classes
            .iter()
            .map(|c| c.trim())
            .collect::<Vec<_>>()
            .join(", "),
        lessons: raw
            .lessons
            .iter()
            .map(lesson_label)
            .collect::<Vec<_>>()
            .join(", "),
        previous_subject: non_empty(raw.previous_subject),
        subject: non_empty(raw.subject),
        previous_room: non_empty(raw.previous_room),
        room: non_empty(raw.room),
        previous_teacher: non_empty(raw.previous_teacher),
        teacher: non_empty(raw.teacher),
        comment,
        canceled: canceled.trim() == CANCELED_MARKER,
    }
}

/// Lessons arrive as numbers, occasionally as strings.
fn lesson_label(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_version(version: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(version) {
        return Ok(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(version, fmt).ok())
        .ok_or_else(|| EngineError::InvalidDatetime(format!("plan version '{version}'")))
}
