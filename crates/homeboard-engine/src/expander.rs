//! Recurrence expansion.
//!
//! Turns a [`RecurrenceRule`] plus the first scheduled occurrence of a series
//! (the anchor) into every occurrence that falls inside a civil-date window.
//!
//! The walk always starts at the anchor, never at the window start, so the
//! interval phase of the series is preserved and `COUNT` is consumed by
//! occurrences that happened before the window. Each candidate is the previous
//! one advanced by one interval with calendar arithmetic, so a month-end
//! anchor settles on the clamped day (Jan 31 → Feb 29 → Mar 29).
//!
//! Whole-day series ([`NaiveDate`]) and timestamped series
//! ([`DateTime<Tz>`]) are separate implementations of [`Recurring`]; a single
//! expansion cannot mix the two.

use std::iter;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

use crate::civil::{resolve_local, start_of_day, DEFAULT_CIVIL_TIMEZONE};
use crate::rule::{Frequency, RecurrenceRule};

/// A point in time a series can be anchored at and advanced from.
pub trait Recurring: Copy + Ord {
    /// Calendar position a series steps through.
    type Wall: Copy;

    fn wall(&self) -> Self::Wall;

    /// `wall` moved `steps` units of `frequency` forward.
    ///
    /// Returns `None` when the result would leave the representable range.
    fn step(wall: Self::Wall, frequency: Frequency, steps: u32) -> Option<Self::Wall>;

    /// The value at `wall` in the same frame as `self`.
    fn place(&self, wall: Self::Wall) -> Self;

    /// The comparison bound a civil date maps to for this kind of series.
    fn civil_bound(date: NaiveDate, tz: &Tz) -> Self;
}

enum Step {
    Days(Days),
    Months(Months),
}

impl Step {
    fn of(frequency: Frequency, steps: u32) -> Option<Self> {
        Some(match frequency {
            Frequency::Daily => Step::Days(Days::new(u64::from(steps))),
            Frequency::Weekly => Step::Days(Days::new(u64::from(steps) * 7)),
            Frequency::Monthly => Step::Months(Months::new(steps)),
            Frequency::Yearly => Step::Months(Months::new(steps.checked_mul(12)?)),
        })
    }
}

impl Recurring for NaiveDate {
    type Wall = NaiveDate;

    fn wall(&self) -> NaiveDate {
        *self
    }

    fn step(wall: NaiveDate, frequency: Frequency, steps: u32) -> Option<NaiveDate> {
        match Step::of(frequency, steps)? {
            Step::Days(days) => wall.checked_add_days(days),
            Step::Months(months) => wall.checked_add_months(months),
        }
    }

    fn place(&self, wall: NaiveDate) -> Self {
        wall
    }

    fn civil_bound(date: NaiveDate, _tz: &Tz) -> Self {
        date
    }
}

/// Timestamped series advance in the anchor's own wall clock, so a weekly
/// 18:00 event stays at 18:00 across a DST transition.
impl Recurring for DateTime<Tz> {
    type Wall = NaiveDateTime;

    fn wall(&self) -> NaiveDateTime {
        self.naive_local()
    }

    fn step(wall: NaiveDateTime, frequency: Frequency, steps: u32) -> Option<NaiveDateTime> {
        match Step::of(frequency, steps)? {
            Step::Days(days) => wall.checked_add_days(days),
            Step::Months(months) => wall.checked_add_months(months),
        }
    }

    fn place(&self, wall: NaiveDateTime) -> Self {
        resolve_local(&self.timezone(), wall)
    }

    fn civil_bound(date: NaiveDate, tz: &Tz) -> Self {
        start_of_day(date, tz)
    }
}

/// Options for [`expand_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Timezone in which window bounds and the rule's end date are read.
    pub civil_timezone: Tz,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            civil_timezone: DEFAULT_CIVIL_TIMEZONE,
        }
    }
}

/// The unbounded series `anchor`, `anchor + interval`, ...
///
/// The wall clock is carried from step to step, so a time shifted out of a
/// DST gap does not stay shifted on later occurrences.
fn series<T: Recurring>(anchor: T, frequency: Frequency, interval: u32) -> impl Iterator<Item = T> {
    let mut wall = Some(anchor.wall());
    let later = iter::from_fn(move || {
        wall = wall.and_then(|w| T::step(w, frequency, interval));
        wall.map(|w| anchor.place(w))
    });
    iter::once(anchor).chain(later)
}

/// Every candidate the rule generates up to the window end, including those
/// before the window start.
fn generated<T: Recurring>(
    rule: &RecurrenceRule,
    anchor: T,
    window_end: NaiveDate,
    tz: &Tz,
) -> impl Iterator<Item = T> {
    let upper = T::civil_bound(window_end, tz);
    let ceiling = rule.end_date.map(|end| T::civil_bound(end, tz));
    let limit = rule
        .count
        .map_or(usize::MAX, |count| usize::try_from(count.get()).unwrap_or(usize::MAX));

    series(anchor, rule.frequency, rule.interval.get())
        .take_while(move |candidate| {
            *candidate <= upper && ceiling.is_none_or(|end| *candidate < end)
        })
        .take(limit)
}

/// Expand `rule` from `anchor` into the window `[window_start, window_end]`
/// using the default civil timezone.
///
/// See [`expand_with_options`] for the exact semantics.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use homeboard_engine::{expand, RecurrenceRule};
///
/// let rule: RecurrenceRule = "FREQ=DAILY;COUNT=3".parse().unwrap();
/// let day = |d| NaiveDate::from_ymd_opt(2023, 10, d).unwrap();
/// let occurrences = expand(&rule, day(1), day(1), day(5));
/// assert_eq!(occurrences, vec![day(1), day(2), day(3)]);
/// ```
pub fn expand<T: Recurring>(
    rule: &RecurrenceRule,
    anchor: T,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<T> {
    expand_with_options(
        rule,
        anchor,
        window_start,
        window_end,
        &ExpandOptions::default(),
    )
}

/// Expand `rule` from `anchor` into a civil-date window.
///
/// Window bounds and the rule's end date are normalized to the anchor's kind:
/// plain dates for whole-day series, civil-timezone midnight for timestamped
/// series. Generation stops at the first candidate that
///
/// - lies after the window end,
/// - is on or after the rule's end date, or
/// - would exceed the rule's count (counted from the anchor, including
///   occurrences before the window).
///
/// Candidates before the window start are generated but not returned. The
/// result is strictly increasing and may be empty.
pub fn expand_with_options<T: Recurring>(
    rule: &RecurrenceRule,
    anchor: T,
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<T> {
    let tz = &options.civil_timezone;
    let lower = T::civil_bound(window_start, tz);
    generated(rule, anchor, window_end, tz)
        .filter(|candidate| *candidate >= lower)
        .collect()
}

/// Expand an event's start and end series together.
///
/// The start series is bounded exactly like [`expand_with_options`]; each
/// start is paired with the end generated at the same step, so an occurrence
/// that starts before the window but ends inside it never shifts the pairing
/// of later occurrences.
pub fn expand_spans<T: Recurring>(
    rule: &RecurrenceRule,
    start: T,
    end: T,
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<(T, T)> {
    let tz = &options.civil_timezone;
    let lower = T::civil_bound(window_start, tz);
    generated(rule, start, window_end, tz)
        .zip(series(end, rule.frequency, rule.interval.get()))
        .filter(|(candidate, _)| *candidate >= lower)
        .collect()
}

/// Start or end of a calendar event as delivered by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Whole-day event.
    Date(NaiveDate),
    /// Event with a time of day.
    DateTime(DateTime<Tz>),
}

impl EventTime {
    pub fn is_whole_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// The civil date of this value in `tz`.
    pub fn civil_date(&self, tz: &Tz) -> NaiveDate {
        match self {
            EventTime::Date(date) => *date,
            EventTime::DateTime(dt) => dt.with_timezone(tz).date_naive(),
        }
    }
}

/// Expand a runtime-typed anchor, preserving its kind on every occurrence.
pub fn expand_event_time(
    rule: &RecurrenceRule,
    anchor: EventTime,
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<EventTime> {
    match anchor {
        EventTime::Date(date) => {
            expand_with_options(rule, date, window_start, window_end, options)
                .into_iter()
                .map(EventTime::Date)
                .collect()
        }
        EventTime::DateTime(dt) => expand_with_options(rule, dt, window_start, window_end, options)
            .into_iter()
            .map(EventTime::DateTime)
            .collect(),
    }
}

/// [`expand_spans`] for runtime-typed boundaries.
///
/// Returns `None` when start and end are of different kinds.
pub fn expand_event_spans(
    rule: &RecurrenceRule,
    start: EventTime,
    end: EventTime,
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Option<Vec<(EventTime, EventTime)>> {
    match (start, end) {
        (EventTime::Date(start), EventTime::Date(end)) => Some(
            expand_spans(rule, start, end, window_start, window_end, options)
                .into_iter()
                .map(|(s, e)| (EventTime::Date(s), EventTime::Date(e)))
                .collect(),
        ),
        (EventTime::DateTime(start), EventTime::DateTime(end)) => Some(
            expand_spans(rule, start, end, window_start, window_end, options)
                .into_iter()
                .map(|(s, e)| (EventTime::DateTime(s), EventTime::DateTime(e)))
                .collect(),
        ),
        _ => None,
    }
}
