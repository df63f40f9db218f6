//! Capture-date inference for screenshots.
//!
//! A date embedded in the filename wins over filesystem metadata, since
//! copies and syncs routinely reset creation times. Patterns are tried in a
//! fixed priority order and the first one that yields a real calendar date
//! is used.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use regex::{Captures, Regex};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::warn;

const EARLIEST_EPOCH_YEAR: i32 = 1990;

#[derive(Debug, Clone, Copy)]
enum Layout {
    Epoch,
    YearMonthDay,
    MonthDayYear,
    DayMonthYear,
    ShortYearMonthDay,
    ShortMonthDayYear,
}

struct DatePattern {
    regex: Regex,
    layout: Layout,
}

impl DatePattern {
    fn new(pattern: &str, layout: Layout) -> Self {
        Self {
            regex: Regex::new(pattern).expect("date pattern is valid"),
            layout,
        }
    }
}

static PATTERNS: LazyLock<Vec<DatePattern>> = LazyLock::new(|| {
    vec![
        // Unix epoch: 13-digit milliseconds, 10-digit seconds, optional fraction
        DatePattern::new(r"(?:^|\D)(\d{13}|\d{10}(?:\.\d+)?)(?:\D|$)", Layout::Epoch),
        DatePattern::new(r"(\d{4})-(\d{2})-(\d{2})", Layout::YearMonthDay),
        DatePattern::new(r"(\d{1,2})/(\d{1,2})/(\d{4})", Layout::MonthDayYear),
        DatePattern::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})", Layout::DayMonthYear),
        DatePattern::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)", Layout::YearMonthDay),
        DatePattern::new(r"(\d{4})_(\d{1,2})_(\d{1,2})", Layout::YearMonthDay),
        DatePattern::new(r"(\d{1,2})_(\d{1,2})_(\d{4})", Layout::DayMonthYear),
        DatePattern::new(r"(?:^|\D)(\d{2})-(\d{2})-(\d{2})(?:\D|$)", Layout::ShortYearMonthDay),
        DatePattern::new(r"(?:^|\D)(\d{2})-(\d{2})-(\d{2})(?:\D|$)", Layout::ShortMonthDayYear),
    ]
});

/// Returns `YYYY-MM-DD` for the file, or an empty string if neither the
/// filename nor the filesystem could provide a date.
pub fn infer_date(path: &Path) -> String {
    let from_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(date_from_file_name);

    if let Some(date) = from_name {
        return format_date(date);
    }

    match date_from_metadata(path) {
        Ok(date) => format_date(date),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read file timestamps");
            String::new()
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    PATTERNS.iter().find_map(|pattern| {
        pattern
            .regex
            .captures_iter(name)
            .find_map(|caps| interpret(&caps, pattern.layout))
    })
}

/// Creation time, or modification time where the filesystem has no birth time.
pub fn date_from_metadata(path: &Path) -> io::Result<NaiveDate> {
    let metadata = fs::metadata(path)?;
    let timestamp = metadata.created().or_else(|_| metadata.modified())?;
    Ok(local_date(timestamp))
}

fn local_date(time: SystemTime) -> NaiveDate {
    DateTime::<Local>::from(time).date_naive()
}

fn interpret(caps: &Captures, layout: Layout) -> Option<NaiveDate> {
    let number = |index: usize| -> Option<u32> { caps.get(index)?.as_str().parse().ok() };

    match layout {
        Layout::Epoch => from_epoch(caps.get(1)?.as_str()),
        Layout::YearMonthDay => calendar_date(number(1)? as i32, number(2)?, number(3)?),
        Layout::MonthDayYear => calendar_date(number(3)? as i32, number(1)?, number(2)?),
        Layout::DayMonthYear => calendar_date(number(3)? as i32, number(2)?, number(1)?),
        Layout::ShortYearMonthDay => calendar_date(expand_year(number(1)?), number(2)?, number(3)?),
        Layout::ShortMonthDayYear => calendar_date(expand_year(number(3)?), number(1)?, number(2)?),
    }
}

/// Only dates that exist on the calendar survive (no February 30th).
fn calendar_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(short: u32) -> i32 {
    let short = short as i32;
    if short < 70 {
        2000 + short
    } else {
        1900 + short
    }
}

fn from_epoch(digits: &str) -> Option<NaiveDate> {
    let (seconds, nanos) = if digits.len() == 13 && !digits.contains('.') {
        let millis: i64 = digits.parse().ok()?;
        (millis.div_euclid(1000), (millis.rem_euclid(1000) * 1_000_000) as u32)
    } else {
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        let seconds: i64 = whole.parse().ok()?;
        let fraction: f64 = format!("0.{}", fraction).parse().unwrap_or(0.0);
        (seconds, (fraction * 1e9) as u32)
    };

    let date = DateTime::from_timestamp(seconds, nanos)?
        .with_timezone(&Local)
        .date_naive();

    let latest_year = Local::now().year() + 1;
    (EARLIEST_EPOCH_YEAR..=latest_year)
        .contains(&date.year())
        .then_some(date)
}
