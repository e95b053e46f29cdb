//! Stage 3: replace the combined sender with `Mail` and `Name`.

use tracing::info;

use crate::model::address::SenderIdentity;
use crate::model::record::{FinalRecord, TimedRecord};
use crate::model::table::MessageTable;

/// Split one record's sender. A missing sender gives empty `mail` and `name`.
pub fn split_record(record: &TimedRecord) -> FinalRecord {
    let identity = record
        .from
        .as_deref()
        .map(SenderIdentity::split)
        .unwrap_or_default();

    FinalRecord {
        date: record.date,
        subject: record.subject.clone(),
        time: record.time,
        hour: record.hour,
        weekday: record.weekday,
        mail: identity.address,
        name: identity.name,
    }
}

/// Split every sender in the table.
pub fn split_identities(table: &MessageTable<TimedRecord>) -> MessageTable<FinalRecord> {
    let finals = table.map(split_record);
    info!(rows = finals.len(), "Sender split done");
    finals
}
