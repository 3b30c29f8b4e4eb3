use chrono::{Local, NaiveDate, NaiveTime};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kcal_core::models::{CalorieEntry, CalorieRecord, PublicUser};
use kcal_core::{Error, ErrorKind};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M";

/// Resolve an entry date, defaulting to today. Stored as `YYYY-MM-DD`.
pub(crate) fn parse_date(date_str: Option<String>) -> kcal_core::Result<String> {
    match date_str {
        None => Ok(Local::now().date_naive().format(DATE_FORMAT).to_string()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive().format(DATE_FORMAT).to_string()),
            "yesterday" => Ok((Local::now().date_naive() - chrono::Duration::days(1))
                .format(DATE_FORMAT)
                .to_string()),
            _ => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map(|d| d.format(DATE_FORMAT).to_string())
                .map_err(|_| {
                    Error::InvalidRequest(format!(
                        "Invalid date '{s}'. Use YYYY-MM-DD, today or yesterday"
                    ))
                }),
        },
    }
}

/// Resolve an entry time, defaulting to now. Stored as `HH:MM`.
pub(crate) fn parse_time(time_str: Option<String>) -> kcal_core::Result<String> {
    match time_str {
        None => Ok(Local::now().time().format(TIME_FORMAT).to_string()),
        Some(s) => NaiveTime::parse_from_str(&s, TIME_FORMAT)
            .map(|t| t.format(TIME_FORMAT).to_string())
            .map_err(|_| Error::InvalidRequest(format!("Invalid time '{s}'. Use HH:MM (24-hour)"))),
    }
}

/// The message shown to the user for a core failure.
pub(crate) fn error_message(err: &Error) -> String {
    let base = match err.kind() {
        ErrorKind::NotAllowed => "Not authorized.",
        ErrorKind::UnknownUser => "User not found.",
        ErrorKind::UnknownCalorie => "Calorie not found.",
        ErrorKind::UserAlreadyExists => "User already exists.",
        ErrorKind::InvalidRequest => "Invalid request.",
        ErrorKind::InitialAdminRole => "Can't change admin username or role.",
        ErrorKind::InvalidCredentials => "Wrong username or password.",
        ErrorKind::Internal => "Internal error.",
    };
    match err {
        Error::InvalidRequest(detail) => format!("{base} {detail}"),
        _ => base.to_string(),
    }
}

pub(crate) fn print_user_table(users: &[&PublicUser]) {
    #[derive(Tabled)]
    struct UserRow {
        #[tabled(rename = "Username")]
        username: String,
        #[tabled(rename = "Role")]
        role: String,
        #[tabled(rename = "Target kcal/day")]
        target: i64,
    }

    let rows: Vec<UserRow> = users
        .iter()
        .map(|u| UserRow {
            username: truncate(&u.username, 30),
            role: u.role.to_string(),
            target: u.expected_calories_per_day,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_entry_table(entries: &[&CalorieEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "User")]
        username: String,
        #[tabled(rename = "Text")]
        text: String,
        #[tabled(rename = "kcal")]
        calories: i64,
        #[tabled(rename = "Within target")]
        below_expected: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id,
            date: e.date.clone(),
            time: e.time.clone(),
            username: truncate(&e.username, 20),
            text: truncate(&e.text, 35),
            calories: e.number_of_calories,
            below_expected: if e.below_expected { "yes" } else { "no" }.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_record_table(records: &[CalorieRecord]) {
    #[derive(Tabled)]
    struct RecordRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "User")]
        username: String,
        #[tabled(rename = "Text")]
        text: String,
        #[tabled(rename = "kcal")]
        calories: i64,
    }

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            id: r.id,
            date: r.date.clone(),
            time: r.time.clone(),
            username: truncate(&r.username, 20),
            text: truncate(&r.text, 35),
            calories: r.number_of_calories,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
