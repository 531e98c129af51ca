//! Municipal waste collection schedule.
//!
//! The municipal waste service exposes places, streets, house numbers and
//! finally the collection dates of one house number. The records below mirror
//! that JSON (German wire names mapped onto English fields); the functions
//! narrow the full-year schedule down to what the dashboard shows.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::civil::short_day_label;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Place {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HouseNumber {
    pub id: u64,
    pub nr: String,
    #[serde(default)]
    pub plz: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Street {
    pub id: u64,
    pub name: String,
    #[serde(rename = "hausNrList", default)]
    pub house_numbers: Vec<HouseNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct District {
    pub id: u64,
    pub name: String,
    #[serde(rename = "gueltigAb", default)]
    pub valid_from: Option<String>,
    #[serde(rename = "fraktionId")]
    pub fraction_id: i64,
}

/// One pickup date for one kind of waste.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Collection {
    pub id: u64,
    #[serde(rename = "bezirk")]
    pub district: District,
    #[serde(rename = "datum")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WasteKind {
    Residual,
    Paper,
    Packaging,
    Organic,
    ChristmasTree,
    Unknown,
}

impl WasteKind {
    pub fn from_fraction(fraction_id: i64) -> Self {
        match fraction_id {
            0 => WasteKind::Residual,
            1 => WasteKind::Paper,
            2 => WasteKind::Packaging,
            3 => WasteKind::Organic,
            4 => WasteKind::ChristmasTree,
            _ => WasteKind::Unknown,
        }
    }

    /// Label shown on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            WasteKind::Residual => "Restmüll",
            WasteKind::Paper => "Papier",
            WasteKind::Packaging => "Gelbe Tonne",
            WasteKind::Organic => "Biotonne",
            WasteKind::ChristmasTree => "Weihnachtsbaum",
            WasteKind::Unknown => "Unbekannt",
        }
    }
}

impl fmt::Display for WasteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Collection {
    pub fn kind(&self) -> WasteKind {
        WasteKind::from_fraction(self.district.fraction_id)
    }

    /// Days from `today` until pickup; negative once it has passed.
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.date - today).num_days()
    }

    pub fn day_label(&self) -> String {
        short_day_label(self.date)
    }
}

fn parse<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_places(json: &str) -> Result<Vec<Place>> {
    parse(json)
}

pub fn parse_streets(json: &str) -> Result<Vec<Street>> {
    parse(json)
}

/// A single street including its house numbers.
pub fn parse_street(json: &str) -> Result<Street> {
    parse(json)
}

pub fn parse_collections(json: &str) -> Result<Vec<Collection>> {
    let collections: Vec<Collection> = parse(json)?;
    tracing::info!(count = collections.len(), "read waste collection dates");
    Ok(collections)
}

pub fn find_place<'a>(places: &'a [Place], name: &str) -> Option<&'a Place> {
    places.iter().find(|p| p.name == name)
}

pub fn find_street<'a>(streets: &'a [Street], name: &str) -> Option<&'a Street> {
    streets.iter().find(|s| s.name == name)
}

pub fn find_house_number<'a>(street: &'a Street, nr: &str) -> Option<&'a HouseNumber> {
    street.house_numbers.iter().find(|h| h.nr == nr)
}

fn sorted_between(collections: &[Collection], from: NaiveDate, to: NaiveDate) -> Vec<Collection> {
    let mut selected: Vec<Collection> = collections
        .iter()
        .filter(|c| from <= c.date && c.date <= to)
        .cloned()
        .collect();
    selected.sort_by_key(|c| c.date);
    selected
}

/// Collections from `today` up to `month_limit` months ahead, by date.
pub fn upcoming(collections: &[Collection], today: NaiveDate, month_limit: u32) -> Vec<Collection> {
    let horizon = today
        .checked_add_months(Months::new(month_limit))
        .unwrap_or(NaiveDate::MAX);
    sorted_between(collections, today, horizon)
}

/// Collections in the Monday–Sunday week containing tomorrow.
///
/// Looking at tomorrow means that on Sundays the dashboard already shows the
/// coming week.
pub fn this_week(collections: &[Collection], today: NaiveDate) -> Vec<Collection> {
    let tomorrow = today.succ_opt().unwrap_or(today);
    let monday = tomorrow - Days::new(u64::from(tomorrow.weekday().num_days_from_monday()));
    let sunday = monday + Days::new(6);
    let near = upcoming(collections, today, 1);
    let week: Vec<Collection> = near
        .into_iter()
        .filter(|c| monday <= c.date && c.date <= sunday)
        .collect();
    tracing::debug!(%monday, %sunday, count = week.len(), "selected collections of this week");
    week
}

/// Collections due within `alert_days` days from `today`.
pub fn due_within(collections: &[Collection], today: NaiveDate, alert_days: u32) -> Vec<Collection> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(alert_days)))
        .unwrap_or(NaiveDate::MAX);
    sorted_between(collections, today, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTIONS: &str = r#"[
        {"id": 1, "bezirk": {"id": 10, "name": "R2", "gueltigAb": null, "fraktionId": 0}, "datum": "2023-10-12"},
        {"id": 2, "bezirk": {"id": 11, "name": "P1", "gueltigAb": null, "fraktionId": 1}, "datum": "2023-10-04"},
        {"id": 3, "bezirk": {"id": 12, "name": "G3", "gueltigAb": "2023-01-01", "fraktionId": 2}, "datum": "2023-10-06"},
        {"id": 4, "bezirk": {"id": 13, "name": "B1", "gueltigAb": null, "fraktionId": 3}, "datum": "2023-09-28"},
        {"id": 5, "bezirk": {"id": 14, "name": "W", "gueltigAb": null, "fraktionId": 4}, "datum": "2024-01-10"},
        {"id": 6, "bezirk": {"id": 15, "name": "X", "gueltigAb": null, "fraktionId": 9}, "datum": "2023-10-30"}
    ]"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn collections() -> Vec<Collection> {
        parse_collections(COLLECTIONS).unwrap()
    }

    #[test]
    fn test_kinds_and_labels() {
        let all = collections();
        let labels: Vec<&str> = all.iter().map(|c| c.kind().label()).collect();
        assert_eq!(
            labels,
            vec!["Restmüll", "Papier", "Gelbe Tonne", "Biotonne", "Weihnachtsbaum", "Unbekannt"]
        );
        assert_eq!(all[2].district.valid_from.as_deref(), Some("2023-01-01"));
        assert_eq!(all[1].day_label(), "Mi., 4.10.2023");
    }

    #[test]
    fn test_days_until() {
        let all = collections();
        assert_eq!(all[0].days_until(date(2023, 10, 2)), 10);
        assert_eq!(all[3].days_until(date(2023, 10, 2)), -4);
    }

    #[test]
    fn test_upcoming_filters_and_sorts() {
        let result = upcoming(&collections(), date(2023, 10, 2), 2);
        let ids: Vec<u64> = result.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 6]);
    }

    #[test]
    fn test_upcoming_horizon_is_inclusive() {
        let result = upcoming(&collections(), date(2023, 9, 30), 1);
        assert_eq!(result.last().map(|c| c.id), Some(6));
    }

    #[test]
    fn test_this_week_on_monday() {
        // Monday Oct 2: week of tomorrow is Oct 2–8.
        let ids: Vec<u64> = this_week(&collections(), date(2023, 10, 2))
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_this_week_on_sunday_shows_next_week() {
        // Sunday Oct 8: tomorrow starts the week of Oct 9–15.
        let ids: Vec<u64> = this_week(&collections(), date(2023, 10, 8))
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_due_within_alert_days() {
        let ids: Vec<u64> = due_within(&collections(), date(2023, 10, 1), 5)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_address_lookup_chain() {
        let places = parse_places(r#"[{"id": 4546575, "name": "Mülheim"}]"#).unwrap();
        assert_eq!(find_place(&places, "Mülheim").map(|p| p.id), Some(4546575));
        assert!(find_place(&places, "Essen").is_none());

        let streets = parse_streets(
            r#"[
                {"id": 4134672, "name": "Zunftmeisterstraße", "staticId": "abc", "hausNrList": [], "plz": null},
                {"id": 4555127, "name": "Friedhofstraße", "hausNrList": []}
            ]"#,
        )
        .unwrap();
        assert_eq!(find_street(&streets, "Friedhofstraße").map(|s| s.id), Some(4555127));

        let street = parse_street(
            r#"{"id": 4555127, "name": "Friedhofstraße", "hausNrList": [
                {"id": 4112629, "nr": "9", "plz": "45478", "staticId": "a"},
                {"id": 4112605, "nr": "62", "plz": "45478", "staticId": "b"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(find_house_number(&street, "62").map(|h| h.id), Some(4112605));
        assert!(find_house_number(&street, "63").is_none());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(parse_collections(r#"[{"id": 1}]"#).is_err());
    }
}
