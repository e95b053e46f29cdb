//! Export functionality: delimited snapshots at each pipeline checkpoint.

pub mod csv;

use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::Result;
use crate::model::record::{FinalRecord, RawRecord, TimedRecord};
use crate::model::table::MessageTable;

use self::csv::{export_table, CsvOptions};

/// The three checkpoints written during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Date, From, Subject as fetched.
    Raw,
    /// Date-derived columns added.
    Cleaned,
    /// From split into Mail and Name.
    Final,
}

impl Checkpoint {
    /// File path for this checkpoint inside `dir`.
    pub fn path_in(self, dir: &Path, config: &ExportConfig) -> PathBuf {
        dir.join(match self {
            Self::Raw => &config.raw_file,
            Self::Cleaned => &config.cleaned_file,
            Self::Final => &config.final_file,
        })
    }

    /// Writer options for this checkpoint. Only the final file uses the
    /// alternative separator, since free-text names and subjects contain commas.
    pub fn options(self, config: &ExportConfig) -> CsvOptions {
        let delimiter = match self {
            Self::Raw | Self::Cleaned => ',',
            Self::Final => config.final_separator,
        };
        CsvOptions {
            delimiter,
            utf8_bom: config.utf8_bom,
        }
    }
}

/// Write the stage-1 snapshot.
pub fn write_raw(
    table: &MessageTable<RawRecord>,
    dir: &Path,
    config: &ExportConfig,
) -> Result<PathBuf> {
    write_checkpoint(table, Checkpoint::Raw, dir, config)
}

/// Write the stage-2 snapshot.
pub fn write_cleaned(
    table: &MessageTable<TimedRecord>,
    dir: &Path,
    config: &ExportConfig,
) -> Result<PathBuf> {
    write_checkpoint(table, Checkpoint::Cleaned, dir, config)
}

/// Write the stage-3 snapshot.
pub fn write_final(
    table: &MessageTable<FinalRecord>,
    dir: &Path,
    config: &ExportConfig,
) -> Result<PathBuf> {
    write_checkpoint(table, Checkpoint::Final, dir, config)
}

fn write_checkpoint<R: csv::Row>(
    table: &MessageTable<R>,
    checkpoint: Checkpoint,
    dir: &Path,
    config: &ExportConfig,
) -> Result<PathBuf> {
    let path = checkpoint.path_in(dir, config);
    export_table(table, &path, &checkpoint.options(config))?;
    Ok(path)
}
