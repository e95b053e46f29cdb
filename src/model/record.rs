//! Message records at each pipeline stage.
//!
//! Each stage has its own record type so a table's schema is fixed by its
//! type: [`RawRecord`] (as fetched), [`TimedRecord`] (date-derived columns
//! added) and [`FinalRecord`] (`From` replaced by `Mail` and `Name`).

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Weekday};

use crate::export::csv::Row;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Clock-hour span label: `"09h-10h"`.
///
/// The upper bound is `hour + 1` without wrapping, so hour 23 is labelled
/// `"23h-24h"`. Only the lower bound is zero-padded (`"00h-1h"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourBucket(u32);

impl HourBucket {
    /// Bucket for a clock hour in `0..24`.
    pub fn new(hour: u32) -> Option<Self> {
        (hour < 24).then_some(Self(hour))
    }

    /// The lower bound of the span.
    pub fn hour(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HourBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}h-{}h", self.0, self.0 + 1)
    }
}

impl FromStr for HourBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = s
            .split_once("h-")
            .ok_or_else(|| format!("not an hour bucket: '{s}'"))?;
        let hour: u32 = low.parse().map_err(|_| format!("bad hour in '{s}'"))?;
        if high != format!("{}h", hour + 1) {
            return Err(format!("inconsistent hour bucket: '{s}'"));
        }
        Self::new(hour).ok_or_else(|| format!("hour out of range: '{s}'"))
    }
}

/// Full English weekday name, as written to the `WeekDay` column.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Stage 1: one message as fetched.
///
/// `date` and `from` are the raw header text; `subject` is decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub date: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
}

/// Stage 2: the date narrowed to a calendar day, plus clock time, hour
/// bucket and weekday. All four are `None` when the date did not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimedRecord {
    pub date: Option<NaiveDate>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub time: Option<NaiveTime>,
    pub hour: Option<HourBucket>,
    pub weekday: Option<Weekday>,
}

/// Stage 3: the combined sender replaced by `mail` and `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalRecord {
    pub date: Option<NaiveDate>,
    pub subject: Option<String>,
    pub time: Option<NaiveTime>,
    pub hour: Option<HourBucket>,
    pub weekday: Option<Weekday>,
    pub mail: Option<String>,
    pub name: Option<String>,
}

// ── Cell conversion ─────────────────────────────────────────────

fn text_cell(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn date_cell(v: &Option<NaiveDate>) -> String {
    v.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn time_cell(v: &Option<NaiveTime>) -> String {
    v.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default()
}

fn hour_cell(v: &Option<HourBucket>) -> String {
    v.map(|h| h.to_string()).unwrap_or_default()
}

fn weekday_cell(v: &Option<Weekday>) -> String {
    v.map(|d| weekday_name(d).to_string()).unwrap_or_default()
}

fn parse_text(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

/// Parse an optional typed cell; an empty cell is a null value.
fn parse_cell<T>(
    cell: &str,
    column: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    if cell.is_empty() {
        return Ok(None);
    }
    parse(cell)
        .map(Some)
        .ok_or_else(|| format!("invalid {column} value '{cell}'"))
}

fn parse_date_cell(cell: &str) -> Result<Option<NaiveDate>, String> {
    parse_cell(cell, "Date", |c| NaiveDate::parse_from_str(c, DATE_FORMAT).ok())
}

fn parse_time_cell(cell: &str) -> Result<Option<NaiveTime>, String> {
    parse_cell(cell, "H_M_S", |c| NaiveTime::parse_from_str(c, TIME_FORMAT).ok())
}

fn parse_hour_cell(cell: &str) -> Result<Option<HourBucket>, String> {
    parse_cell(cell, "Hour", |c| c.parse().ok())
}

fn parse_weekday_cell(cell: &str) -> Result<Option<Weekday>, String> {
    parse_cell(cell, "WeekDay", |c| c.parse().ok())
}

fn expect_width(cells: &[String], width: usize) -> Result<(), String> {
    if cells.len() == width {
        Ok(())
    } else {
        Err(format!("expected {width} columns, found {}", cells.len()))
    }
}

impl Row for RawRecord {
    const HEADERS: &'static [&'static str] = &["Date", "From", "Subject"];

    fn cells(&self) -> Vec<String> {
        vec![
            text_cell(&self.date),
            text_cell(&self.from),
            text_cell(&self.subject),
        ]
    }

    fn from_cells(cells: &[String]) -> Result<Self, String> {
        expect_width(cells, Self::HEADERS.len())?;
        Ok(Self {
            date: parse_text(&cells[0]),
            from: parse_text(&cells[1]),
            subject: parse_text(&cells[2]),
        })
    }
}

impl Row for TimedRecord {
    const HEADERS: &'static [&'static str] =
        &["Date", "From", "Subject", "H_M_S", "Hour", "WeekDay"];

    fn cells(&self) -> Vec<String> {
        vec![
            date_cell(&self.date),
            text_cell(&self.from),
            text_cell(&self.subject),
            time_cell(&self.time),
            hour_cell(&self.hour),
            weekday_cell(&self.weekday),
        ]
    }

    fn from_cells(cells: &[String]) -> Result<Self, String> {
        expect_width(cells, Self::HEADERS.len())?;
        Ok(Self {
            date: parse_date_cell(&cells[0])?,
            from: parse_text(&cells[1]),
            subject: parse_text(&cells[2]),
            time: parse_time_cell(&cells[3])?,
            hour: parse_hour_cell(&cells[4])?,
            weekday: parse_weekday_cell(&cells[5])?,
        })
    }
}

impl Row for FinalRecord {
    const HEADERS: &'static [&'static str] =
        &["Date", "Subject", "H_M_S", "Hour", "WeekDay", "Mail", "Name"];

    fn cells(&self) -> Vec<String> {
        vec![
            date_cell(&self.date),
            text_cell(&self.subject),
            time_cell(&self.time),
            hour_cell(&self.hour),
            weekday_cell(&self.weekday),
            text_cell(&self.mail),
            text_cell(&self.name),
        ]
    }

    fn from_cells(cells: &[String]) -> Result<Self, String> {
        expect_width(cells, Self::HEADERS.len())?;
        Ok(Self {
            date: parse_date_cell(&cells[0])?,
            subject: parse_text(&cells[1]),
            time: parse_time_cell(&cells[2])?,
            hour: parse_hour_cell(&cells[3])?,
            weekday: parse_weekday_cell(&cells[4])?,
            mail: parse_text(&cells[5]),
            name: parse_text(&cells[6]),
        })
    }
}
