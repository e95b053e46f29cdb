//! Stage 1: one [`RawRecord`] per fetched message.

use tracing::{info, warn};

use crate::error::Result;
use crate::fetch::{order_ids, HeaderStream, MailSource};
use crate::model::record::RawRecord;
use crate::model::table::MessageTable;
use crate::parser::header::{decode_header_value, decode_raw_header, get_header, unfold_headers};

/// Build a record from a raw header block.
///
/// `Date` and `From` are kept as raw text; `Subject` is decoded. Missing or
/// empty headers become `None`; nothing here fails.
pub fn record_from_headers(raw_headers: &[u8]) -> RawRecord {
    let text = decode_raw_header(raw_headers);
    let headers = unfold_headers(&text);
    let field = |name: &str| get_header(&headers, name).filter(|v| !v.is_empty());

    RawRecord {
        date: field("date"),
        from: field("from"),
        subject: field("subject").map(|s| decode_header_value(&s)),
    }
}

/// Drain a header stream into a table. The first fetch error aborts.
pub fn build_table<I>(stream: I) -> Result<MessageTable<RawRecord>>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    stream.collect::<Result<Vec<_>>>().map(MessageTable::new)
}

/// Fetch every message of `folder` from `source` and build the stage-1 table.
///
/// The session is logged out afterwards, whether or not the fetch succeeded.
/// `progress` receives `(fetched, total)` after every message.
pub fn fetch_table<S: MailSource>(
    mut source: S,
    folder: &str,
    newest_first: bool,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<MessageTable<RawRecord>> {
    let result = collect_folder(&mut source, folder, newest_first, progress);

    if let Err(e) = source.logout() {
        warn!(error = %e, "Logout failed");
    }

    let table = result?;
    info!(folder, rows = table.len(), "Fetched message headers");
    Ok(table)
}

fn collect_folder<S: MailSource>(
    source: &mut S,
    folder: &str,
    newest_first: bool,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<MessageTable<RawRecord>> {
    let ids = order_ids(source.message_ids(folder)?, newest_first);
    build_table(HeaderStream::new(source, ids, progress))
}
