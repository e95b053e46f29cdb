//! Summary statistics over the final table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::model::record::{weekday_name, FinalRecord, HourBucket};
use crate::model::table::MessageTable;

/// Return the date range (oldest, newest) across dated records.
pub fn date_range(table: &MessageTable<FinalRecord>) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = table.iter().filter_map(|r| r.date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d))))
}

/// Count records whose date could not be parsed.
pub fn count_undated(table: &MessageTable<FinalRecord>) -> usize {
    table.iter().filter(|r| r.date.is_none()).count()
}

/// Return the top N senders by message count.
///
/// Senders are keyed by display name, falling back to the address.
pub fn top_senders(table: &MessageTable<FinalRecord>, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in table {
        if let Some(key) = record.name.as_ref().or(record.mail.as_ref()) {
            *counts.entry(key.clone()).or_default() += 1;
        }
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

/// The N busiest hour buckets, most messages first.
pub fn busiest_hours(table: &MessageTable<FinalRecord>, n: usize) -> Vec<(HourBucket, usize)> {
    let mut counts: HashMap<HourBucket, usize> = HashMap::new();
    for hour in table.iter().filter_map(|r| r.hour) {
        *counts.entry(hour).or_default() += 1;
    }
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

/// Message count per weekday, Monday first; days without mail are omitted.
pub fn weekday_histogram(table: &MessageTable<FinalRecord>) -> Vec<(Weekday, usize)> {
    let mut counts = [0usize; 7];
    for day in table.iter().filter_map(|r| r.weekday) {
        counts[day.num_days_from_monday() as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > 0)
        .filter_map(|(i, &c)| Weekday::try_from(i as u8).ok().map(|d| (d, c)))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size: u64,
}

impl WrittenFile {
    /// Describe a file on disk; a missing file reports size 0.
    pub fn stat(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        }
    }
}

/// Everything printed after a run, serializable for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub message_count: usize,
    pub undated: usize,
    pub oldest: Option<NaiveDate>,
    pub newest: Option<NaiveDate>,
    pub top_senders: Vec<LabelCount>,
    pub busiest_hours: Vec<LabelCount>,
    pub weekdays: Vec<LabelCount>,
    pub distinct_words: Option<usize>,
    pub files: Vec<WrittenFile>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn new(table: &MessageTable<FinalRecord>, files: &[PathBuf], elapsed: Duration) -> Self {
        let range = date_range(table);
        let labelled = |items: Vec<(String, usize)>| {
            items
                .into_iter()
                .map(|(label, count)| LabelCount { label, count })
                .collect::<Vec<_>>()
        };

        Self {
            message_count: table.len(),
            undated: count_undated(table),
            oldest: range.map(|(min, _)| min),
            newest: range.map(|(_, max)| max),
            top_senders: labelled(top_senders(table, 10)),
            busiest_hours: labelled(
                busiest_hours(table, 3)
                    .into_iter()
                    .map(|(h, c)| (h.to_string(), c))
                    .collect(),
            ),
            weekdays: labelled(
                weekday_histogram(table)
                    .into_iter()
                    .map(|(d, c)| (weekday_name(d).to_string(), c))
                    .collect(),
            ),
            distinct_words: None,
            files: files.iter().map(|p| WrittenFile::stat(p)).collect(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Record the rendered cloud image and its vocabulary size.
    pub fn with_cloud(mut self, image: &Path, distinct_words: usize) -> Self {
        self.files.push(WrittenFile::stat(image));
        self.distinct_words = Some(distinct_words);
        self
    }
}
