//! Municipal appointment booking watch.
//!
//! The citizens' office publishes its next free slot inside a
//! `<summary id="suggest_location_summary">` element, e.g.
//! `Nächster Termin ab 21.01.2025, 08:30 Uhr`. [`BookingWatch`] fetches that
//! page through a [`BookingPageSource`], and when the slot falls inside the
//! configured timeframe it sends a [`PushMessage`] through a [`Notifier`].
//! Fetching and delivery are the caller's I/O; everything here is pure.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate, NaiveTime};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::config::BookingSettings;
use crate::error::{EngineError, Result};

const SUMMARY_SELECTOR: &str = "summary#suggest_location_summary";
const NOTIFICATION_TITLE: &str = "Bürgeramt Termin Alarm";

/// The next bookable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// A push notification ready to hand to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub message: String,
    pub device: Option<String>,
}

impl PushMessage {
    /// Form fields for the gateway request; credentials are added by the sender.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("title", self.title.as_str()), ("message", self.message.as_str())];
        if let Some(device) = &self.device {
            fields.push(("device", device.as_str()));
        }
        fields
    }
}

/// Supplies the HTML of the booking page.
pub trait BookingPageSource {
    fn fetch_page(&self) -> Result<String>;
}

/// Delivers push notifications.
pub trait Notifier {
    fn send(&self, message: &PushMessage) -> Result<()>;
}

/// What a single poll found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A slot inside the timeframe was found and announced.
    Notified(NextSlot),
    /// The next slot is further away than the timeframe.
    OutsideTimeframe(NextSlot),
    /// The page lists no slot at all.
    NoSlot,
}

/// Text content of the location summary element.
///
/// # Errors
///
/// Returns [`EngineError::PageLayout`] if the page has no such element.
pub fn extract_location_summary(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(SUMMARY_SELECTOR)
        .map_err(|_| EngineError::PageLayout(format!("bad selector '{SUMMARY_SELECTOR}'")))?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .ok_or_else(|| EngineError::PageLayout(format!("no element matching '{SUMMARY_SELECTOR}'")))
}

static RE_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}\.\d{2}\.\d{4}), (\d{2}:\d{2}) Uhr\b").expect("valid slot regex")
});

/// Find the first `dd.mm.yyyy, HH:MM Uhr` in `text`.
pub fn parse_next_slot(text: &str) -> Option<NextSlot> {
    let captures = RE_SLOT.captures(text)?;
    let date = NaiveDate::parse_from_str(&captures[1], "%d.%m.%Y").ok()?;
    let time = NaiveTime::parse_from_str(&captures[2], "%H:%M").ok()?;
    Some(NextSlot { date, time })
}

/// Whether `date` is at most `days` days after `today`.
pub fn is_within_days(date: NaiveDate, today: NaiveDate, days: u32) -> bool {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .is_none_or(|limit| limit >= date)
}

/// Polls the booking page and notifies about near slots.
pub struct BookingWatch<S, N> {
    settings: BookingSettings,
    source: S,
    notifier: N,
}

impl<S: BookingPageSource, N: Notifier> BookingWatch<S, N> {
    pub fn new(settings: BookingSettings, source: S, notifier: N) -> Self {
        Self {
            settings,
            source,
            notifier,
        }
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    /// The message announcing `slot`.
    pub fn message_for(&self, slot: &NextSlot) -> PushMessage {
        PushMessage {
            title: NOTIFICATION_TITLE.to_string(),
            message: format!(
                "Nächster freier Termin für {} Dokumente: {} um {}",
                self.settings.documents,
                slot.date.format("%d.%m.%Y"),
                slot.time.format("%H:%M")
            ),
            device: self.settings.device.clone(),
        }
    }

    /// Fetch the page once and notify if the next slot is close enough.
    ///
    /// # Errors
    ///
    /// Propagates errors from the page source and the notifier, and returns
    /// [`EngineError::PageLayout`] if the page lacks the summary element.
    pub fn poll(&self, today: NaiveDate) -> Result<PollOutcome> {
        let html = self.source.fetch_page()?;
        let summary = extract_location_summary(&html)?;

        let Some(slot) = parse_next_slot(&summary) else {
            tracing::info!("booking page lists no free slot");
            return Ok(PollOutcome::NoSlot);
        };

        if !is_within_days(slot.date, today, self.settings.search_timeframe_days) {
            tracing::info!(
                date = %slot.date,
                timeframe_days = self.settings.search_timeframe_days,
                "no free slot within timeframe"
            );
            return Ok(PollOutcome::OutsideTimeframe(slot));
        }

        let message = self.message_for(&slot);
        self.notifier.send(&message)?;
        tracing::info!(date = %slot.date, time = %slot.time, "announced free slot");
        Ok(PollOutcome::Notified(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const PAGE: &str = r#"<html><body>
        <details>
          <summary id="suggest_location_summary">
            Bürgerbüro Stadtmitte: Nächster Termin ab 21.01.2025, 08:30 Uhr
          </summary>
        </details>
    </body></html>"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct StaticPage(&'static str);

    impl BookingPageSource for StaticPage {
        fn fetch_page(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<PushMessage>>,
    }

    impl Notifier for &RecordingNotifier {
        fn send(&self, message: &PushMessage) -> Result<()> {
            self.sent.borrow_mut().push(message.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send(&self, _message: &PushMessage) -> Result<()> {
            Err(EngineError::Notification("gateway returned 500".to_string()))
        }
    }

    fn settings(days: u32) -> BookingSettings {
        BookingSettings {
            search_timeframe_days: days,
            device: Some("fp4".to_string()),
            ..BookingSettings::default()
        }
    }

    #[test]
    fn test_extract_summary() {
        let summary = extract_location_summary(PAGE).unwrap();
        assert!(summary.starts_with("Bürgerbüro Stadtmitte"));
        assert!(summary.ends_with("08:30 Uhr"));
    }

    #[test]
    fn test_extract_summary_missing() {
        let err = extract_location_summary("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, EngineError::PageLayout(_)));
    }

    #[test]
    fn test_parse_next_slot() {
        let slot = parse_next_slot("Nächster Termin ab 21.01.2025, 08:30 Uhr").unwrap();
        assert_eq!(slot.date, date(2025, 1, 21));
        assert_eq!(slot.time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert!(parse_next_slot("Derzeit keine Termine verfügbar").is_none());
        assert!(parse_next_slot("31.02.2025, 08:30 Uhr").is_none());
    }

    #[test]
    fn test_slot_regex_compiles() {
        assert!(RE_SLOT.is_match("Nächster Termin ab 21.01.2025, 08:30 Uhr"));
        assert!(!RE_SLOT.is_match("Derzeit keine Termine"));
    }

    #[test]
    fn test_is_within_days() {
        let today = date(2025, 1, 18);
        assert!(is_within_days(date(2025, 1, 19), today, 7));
        assert!(is_within_days(date(2025, 1, 25), today, 7));
        assert!(!is_within_days(date(2025, 1, 26), today, 7));
    }

    #[test]
    fn test_poll_notifies_within_timeframe() {
        let notifier = RecordingNotifier::default();
        let watch = BookingWatch::new(settings(7), StaticPage(PAGE), &notifier);
        let outcome = watch.poll(date(2025, 1, 18)).unwrap();
        assert!(matches!(outcome, PollOutcome::Notified(slot) if slot.date == date(2025, 1, 21)));

        let sent = notifier.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].message,
            "Nächster freier Termin für 3 Dokumente: 21.01.2025 um 08:30"
        );
        assert_eq!(sent[0].form_fields().last(), Some(&("device", "fp4")));
    }

    #[test]
    fn test_poll_outside_timeframe_sends_nothing() {
        let notifier = RecordingNotifier::default();
        let watch = BookingWatch::new(settings(1), StaticPage(PAGE), &notifier);
        let outcome = watch.poll(date(2025, 1, 18)).unwrap();
        assert!(matches!(outcome, PollOutcome::OutsideTimeframe(_)));
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn test_poll_without_slot() {
        let page = r#"<summary id="suggest_location_summary">Keine Termine</summary>"#;
        let notifier = RecordingNotifier::default();
        let watch = BookingWatch::new(settings(7), StaticPage(page), &notifier);
        assert_eq!(watch.poll(date(2025, 1, 18)).unwrap(), PollOutcome::NoSlot);
    }

    #[test]
    fn test_poll_propagates_notifier_failure() {
        let watch = BookingWatch::new(settings(7), StaticPage(PAGE), FailingNotifier);
        let err = watch.poll(date(2025, 1, 18)).unwrap_err();
        assert!(err.to_string().contains("gateway returned 500"), "got: {err}");
    }
}
