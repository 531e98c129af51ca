//! Fixture lists scraped from the football and handball association pages.
//!
//! Both sites render upcoming games as HTML tables. The parsers here take the
//! fetched page and return typed games; fetching is the caller's job.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::civil::short_day_label;
use crate::error::{EngineError, Result};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| EngineError::PageLayout(format!("bad selector '{css}'")))
}

/// Element text with runs of whitespace collapsed to single spaces.
fn text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y")
        .map_err(|e| EngineError::InvalidDatetime(format!("'{s}': {e}")))
}

/// One upcoming football game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootballGame {
    pub date: NaiveDate,
    /// Kick-off as printed, `HH:MM`.
    pub time: String,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
    pub result: Option<String>,
}

/// Parse the "next games" fragment of the football association site.
///
/// Every game spans three table rows: a header row
/// (`Sonntag, 08.10.2023 - 11:00 | Kreisliga A`), a venue row, and a row with
/// the two club names and an optional result. A page without a table body
/// has no games.
///
/// # Errors
///
/// Returns [`EngineError::PageLayout`] when a game's rows are incomplete or
/// its header cannot be read.
pub fn parse_football_games(html: &str) -> Result<Vec<FootballGame>> {
    let document = Html::parse_document(html);
    let Some(body) = document.select(&selector("tbody")?).next() else {
        return Ok(Vec::new());
    };

    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let club_sel = selector("div.club-name")?;
    let result_sel = selector("span.info-text")?;

    let rows: Vec<ElementRef<'_>> = body.select(&row_sel).collect();
    let mut games = Vec::with_capacity(rows.len() / 3);
    for chunk in rows.chunks(3) {
        let [header, _venue, details] = chunk else {
            return Err(EngineError::PageLayout("incomplete game rows".to_string()));
        };

        let meta = header
            .select(&cell_sel)
            .next()
            .map(|cell| text_of(&cell))
            .unwrap_or_default();
        let (date, time, competition) = parse_game_header(&meta)?;

        let clubs: Vec<String> = details.select(&club_sel).map(|c| text_of(&c)).collect();
        let [home_team, away_team, ..] = clubs.as_slice() else {
            return Err(EngineError::PageLayout(format!(
                "expected two clubs for game on {date}"
            )));
        };
        let result = details
            .select(&result_sel)
            .next()
            .map(|r| text_of(&r))
            .filter(|r| !r.is_empty());

        games.push(FootballGame {
            date,
            time,
            competition,
            home_team: home_team.clone(),
            away_team: away_team.clone(),
            result,
        });
    }

    tracing::debug!(count = games.len(), "parsed football games");
    Ok(games)
}

/// `Sonntag, 08.10.2023 - 11:00 | Kreisliga A` → date, time, competition.
fn parse_game_header(meta: &str) -> Result<(NaiveDate, String, String)> {
    let layout = || EngineError::PageLayout(format!("unreadable game header '{meta}'"));

    let (when, competition) = meta.split_once(" | ").ok_or_else(layout)?;
    let (_weekday, date_time) = when.split_once(',').ok_or_else(layout)?;
    let (date, time) = date_time.trim().split_once(" - ").ok_or_else(layout)?;
    let competition = competition
        .split(" | ")
        .next()
        .unwrap_or(competition)
        .trim()
        .to_string();

    Ok((parse_date(date)?, time.trim().to_string(), competition))
}

/// Games whose home team contains `club`.
pub fn home_games<'a>(games: &'a [FootballGame], club: &str) -> Vec<&'a FootballGame> {
    games.iter().filter(|g| g.home_team.contains(club)).collect()
}

/// One handball game from the league's team portrait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandballGame {
    pub date: NaiveDate,
    /// German short label, e.g. `Sa., 7.10.2023`.
    pub date_label: String,
    pub time: String,
    /// Originally scheduled time when the game was moved.
    pub time_original: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub location: String,
    pub result: String,
    pub report_link: Option<String>,
    /// Whether the match report is approved; `None` without a report.
    pub report_approved: Option<bool>,
}

/// Parse the fixture table of a handball team portrait page.
///
/// # Errors
///
/// Returns [`EngineError::PageLayout`] when the result table is missing and
/// [`EngineError::InvalidDatetime`] for an unreadable game date.
pub fn parse_handball_games(html: &str) -> Result<Vec<HandballGame>> {
    let document = Html::parse_document(html);
    let table_css = "div#content-row2 table.result-set";
    let table = document
        .select(&selector(table_css)?)
        .next()
        .ok_or_else(|| EngineError::PageLayout(format!("no element matching '{table_css}'")))?;

    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a")?;
    let img_sel = selector("img")?;

    let mut games = Vec::new();
    // The first row holds the column headings.
    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        if cells.len() < 8 {
            tracing::debug!(cells = cells.len(), "skipping short fixture row");
            continue;
        }

        let date = parse_date(&text_of(&cells[1]))?;
        let time = text_of(&cells[2])
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string();
        let report_link = cells[7]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        let report_approved = report_link.as_ref().map(|_| {
            cells
                .get(9)
                .is_some_and(|cell| cell.select(&img_sel).next().is_some())
        });

        games.push(HandballGame {
            date,
            date_label: short_day_label(date),
            time,
            time_original: cells[2].value().attr("alt").map(str::to_string),
            location: text_of(&cells[3]),
            home_team: text_of(&cells[5]),
            away_team: text_of(&cells[6]),
            result: text_of(&cells[7]),
            report_link,
            report_approved,
        });
    }

    tracing::debug!(count = games.len(), "parsed handball games");
    Ok(games)
}
