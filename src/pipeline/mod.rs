//! The linear pipeline: build → temporal enrichment → sender split, with a
//! snapshot written after each stage.
//!
//! Every stage takes an immutable table and returns a new one.

pub mod build;
pub mod identity;
pub mod temporal;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::export;
use crate::model::record::{FinalRecord, RawRecord};
use crate::model::table::MessageTable;

/// Result of processing a stage-1 table.
#[derive(Debug)]
pub struct Processed {
    /// The fully enriched table.
    pub finals: MessageTable<FinalRecord>,
    /// Snapshot paths, in the order they were written.
    pub files: Vec<PathBuf>,
}

/// Run stages 2 and 3 over `raw`, writing the three snapshots into `dir`.
///
/// Snapshots are written as soon as their stage completes, so an export
/// failure leaves only the files of the stages already reached.
pub fn process(raw: &MessageTable<RawRecord>, dir: &Path, config: &Config) -> Result<Processed> {
    std::fs::create_dir_all(dir).map_err(|e| crate::error::MailcloudError::io(dir, e))?;

    let mut files = Vec::with_capacity(3);
    files.push(export::write_raw(raw, dir, &config.export)?);

    let timed = temporal::enrich_temporal(raw, config.enrich.clock);
    files.push(export::write_cleaned(&timed, dir, &config.export)?);

    let finals = identity::split_identities(&timed);
    files.push(export::write_final(&finals, dir, &config.export)?);

    Ok(Processed { finals, files })
}
