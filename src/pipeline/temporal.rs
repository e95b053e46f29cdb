//! Stage 2: date parsing and the derived time columns.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike};
use tracing::{debug, info};

use crate::config::ClockMode;
use crate::model::record::{HourBucket, RawRecord, TimedRecord};
use crate::model::table::MessageTable;
use crate::parser::header::parse_date;

/// Read a parsed timestamp on the requested clock.
fn wall_clock(dt: DateTime<FixedOffset>, clock: ClockMode) -> NaiveDateTime {
    match clock {
        ClockMode::Sender => dt.naive_local(),
        ClockMode::Utc => dt.naive_utc(),
    }
}

/// Enrich one record. An unparseable date nulls every date-derived field.
pub fn enrich_record(record: &RawRecord, clock: ClockMode) -> TimedRecord {
    let stamp = record
        .date
        .as_deref()
        .and_then(parse_date)
        .map(|dt| wall_clock(dt, clock));

    if stamp.is_none() && record.date.is_some() {
        debug!(date = record.date.as_deref(), "Unparseable date, deriving nulls");
    }

    TimedRecord {
        date: stamp.map(|s| s.date()),
        from: record.from.clone(),
        subject: record.subject.clone(),
        time: stamp.map(|s| s.time()),
        hour: stamp.and_then(|s| HourBucket::new(s.hour())),
        weekday: stamp.map(|s| s.weekday()),
    }
}

/// Enrich a whole table; rows and order are preserved.
pub fn enrich_temporal(table: &MessageTable<RawRecord>, clock: ClockMode) -> MessageTable<TimedRecord> {
    let timed = table.map(|r| enrich_record(r, clock));
    let undated = timed.iter().filter(|r| r.date.is_none()).count();
    info!(rows = timed.len(), undated, ?clock, "Temporal enrichment done");
    timed
}
