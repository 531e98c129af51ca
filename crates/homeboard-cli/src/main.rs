use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use homeboard_engine::civil::parse_rfc3339;
use homeboard_engine::{
    expand_event_time, list_appointments, load_config, parse_events, parse_plan, waste,
    window_for, BookingPageSource, BookingWatch, EventTime, Notifier, PollOutcome, PushMessage,
    RecurrenceRule, Settings,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "homeboard",
    version,
    about = "Expand recurring events and inspect household dashboard feeds"
)]
struct Cli {
    /// Configuration file (default: ./homeboard.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expand a recurrence rule into the occurrences inside a date window
    Expand {
        /// Rule string, e.g. "RRULE:FREQ=WEEKLY;INTERVAL=2"
        #[arg(long)]
        rule: String,
        /// First occurrence: YYYY-MM-DD for whole-day series, RFC 3339 otherwise
        #[arg(long)]
        anchor: String,
        /// First day of the window
        #[arg(long)]
        from: NaiveDate,
        /// Last day of the window
        #[arg(long)]
        to: NaiveDate,
    },
    /// List the appointments of a calendar export (JSON) for the coming days
    Calendar {
        /// Input file (reads stdin if omitted or "-")
        input: Option<PathBuf>,
        #[arg(long)]
        today: NaiveDate,
        /// Days to show (overrides the configured number)
        #[arg(long)]
        days: Option<u32>,
        /// Calendar name as configured under [calendar.calendars]
        #[arg(long, default_value = "Kalender")]
        name: String,
    },
    /// Read a substitution plan (JSON) and print it cleaned up
    Substitution {
        /// Input file (reads stdin if omitted or "-")
        input: Option<PathBuf>,
        /// Only rows for this class (overrides the configured filter)
        #[arg(long)]
        class: Option<String>,
    },
    /// Read waste collection dates (JSON) and list the upcoming ones
    Waste {
        /// Input file (reads stdin if omitted or "-")
        input: Option<PathBuf>,
        #[arg(long)]
        today: NaiveDate,
        /// Horizon in months (overrides the configured limit)
        #[arg(long)]
        months: Option<u32>,
        /// Only the week containing tomorrow
        #[arg(long, conflicts_with = "alert")]
        week: bool,
        /// Only collections due within the configured alert days
        #[arg(long)]
        alert: bool,
    },
    /// Check a saved booking page (HTML) for a near free slot
    Booking {
        /// Input file (reads stdin if omitted or "-")
        input: Option<PathBuf>,
        #[arg(long)]
        today: NaiveDate,
        /// Timeframe in days (overrides the configured timeframe)
        #[arg(long)]
        days: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&settings.logging.level);

    match cli.command {
        Command::Expand {
            rule,
            anchor,
            from,
            to,
        } => run_expand(&settings, &rule, &anchor, from, to),
        Command::Calendar {
            input,
            today,
            days,
            name,
        } => run_calendar(&settings, input.as_deref(), today, days, &name),
        Command::Substitution { input, class } => {
            run_substitution(&settings, input.as_deref(), class)
        }
        Command::Waste {
            input,
            today,
            months,
            week,
            alert,
        } => {
            let selection = if week {
                WasteSelection::ThisWeek
            } else if alert {
                WasteSelection::Due
            } else {
                WasteSelection::Upcoming(months)
            };
            run_waste(&settings, input.as_deref(), today, selection)
        }
        Command::Booking { input, today, days } => {
            run_booking(&settings, input.as_deref(), today, days)
        }
    }
}

fn init_tracing(configured_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn run_expand(
    settings: &Settings,
    rule: &str,
    anchor: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<()> {
    let options = settings.expand_options()?;
    let tz = options.civil_timezone;
    let rule = RecurrenceRule::parse_with_timezone(rule, &tz)?;

    let anchor = match anchor.parse::<NaiveDate>() {
        Ok(date) => EventTime::Date(date),
        Err(_) => EventTime::DateTime(parse_rfc3339(anchor)?.with_timezone(&tz)),
    };

    let occurrences = expand_event_time(&rule, anchor, from, to, &options);
    tracing::debug!(%rule, %from, %to, count = occurrences.len(), "expanded rule");
    for occurrence in occurrences {
        match occurrence {
            EventTime::Date(date) => println!("{}", date.format("%Y-%m-%d")),
            EventTime::DateTime(dt) => println!("{}", dt.to_rfc3339()),
        }
    }
    Ok(())
}

fn run_calendar(
    settings: &Settings,
    input: Option<&Path>,
    today: NaiveDate,
    days: Option<u32>,
    name: &str,
) -> Result<()> {
    let options = settings.expand_options()?;
    let events = parse_events(&read_input(input)?, &options.civil_timezone)?;
    let calendar = settings.calendar.calendar_ref(name);
    let (from, to) = window_for(today, days.unwrap_or(settings.calendar.days_to_show));

    for appointment in list_appointments(&calendar, &events, from, to, &options) {
        let time = if appointment.is_whole_day {
            "ganztägig".to_string()
        } else {
            format!("{}-{}", appointment.start_time, appointment.end_time)
        };
        println!("{}\t{}\t{}", appointment.days_label, time, appointment.event_name);
    }
    Ok(())
}

fn run_substitution(settings: &Settings, input: Option<&Path>, class: Option<String>) -> Result<()> {
    let plan = parse_plan(&read_input(input)?)?;
    let class = class.unwrap_or_else(|| settings.substitution.class_filter.clone());
    let plan = if class.is_empty() {
        plan
    } else {
        plan.for_class(&class)
    };
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

enum WasteSelection {
    Upcoming(Option<u32>),
    ThisWeek,
    Due,
}

fn run_waste(
    settings: &Settings,
    input: Option<&Path>,
    today: NaiveDate,
    selection: WasteSelection,
) -> Result<()> {
    let collections = waste::parse_collections(&read_input(input)?)?;
    let selected = match selection {
        WasteSelection::Upcoming(months) => {
            let months = months.unwrap_or(settings.waste.month_limit);
            waste::upcoming(&collections, today, months)
        }
        WasteSelection::ThisWeek => waste::this_week(&collections, today),
        WasteSelection::Due => waste::due_within(&collections, today, settings.waste.alert_days),
    };
    for collection in selected {
        println!("{}\t{}", collection.date.format("%Y-%m-%d"), collection.kind());
    }
    Ok(())
}

/// Serves a page that was saved to disk or piped in.
struct SavedPage(String);

impl BookingPageSource for SavedPage {
    fn fetch_page(&self) -> homeboard_engine::error::Result<String> {
        Ok(self.0.clone())
    }
}

/// Prints the notification instead of sending it.
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn send(&self, message: &PushMessage) -> homeboard_engine::error::Result<()> {
        println!("{}: {}", message.title, message.message);
        Ok(())
    }
}

fn run_booking(
    settings: &Settings,
    input: Option<&Path>,
    today: NaiveDate,
    days: Option<u32>,
) -> Result<()> {
    let mut booking = settings.booking.clone();
    if let Some(days) = days {
        booking.search_timeframe_days = days;
    }
    let timeframe = booking.search_timeframe_days;

    let watch = BookingWatch::new(booking, SavedPage(read_input(input)?), StdoutNotifier);
    match watch.poll(today)? {
        PollOutcome::Notified(_) => {}
        PollOutcome::OutsideTimeframe(slot) => println!(
            "no free appointment within {timeframe} days (next: {} {})",
            slot.date.format("%d.%m.%Y"),
            slot.time.format("%H:%M")
        ),
        PollOutcome::NoSlot => println!("no free appointment listed"),
    }
    Ok(())
}
