//! Mailbox access: the [`MailSource`] seam and the lazy header stream.

pub mod imap_client;

use tracing::debug;

use crate::error::Result;
use crate::model::record::RawRecord;
use crate::pipeline::build::record_from_headers;

/// A read-only mailbox session.
///
/// Implemented by [`imap_client::ImapSource`] for real servers; tests provide
/// in-memory sources.
pub trait MailSource {
    /// Select `folder` and return the identifiers of all its messages.
    fn message_ids(&mut self, folder: &str) -> Result<Vec<u32>>;

    /// Fetch the raw header block of one message. `None` when the server
    /// returned no header data for it.
    fn fetch_header(&mut self, id: u32) -> Result<Option<Vec<u8>>>;

    /// Close the session.
    fn logout(self) -> Result<()>
    where
        Self: Sized;
}

/// Sort identifiers ascending, then reverse them when `newest_first` is set.
pub fn order_ids(mut ids: Vec<u32>, newest_first: bool) -> Vec<u32> {
    ids.sort_unstable();
    ids.dedup();
    if newest_first {
        ids.reverse();
    }
    ids
}

/// Lazily fetches one header block per identifier and turns it into a
/// [`RawRecord`]. One network round trip per `next()`; finite and not
/// restartable.
pub struct HeaderStream<'a, S: MailSource> {
    source: &'a mut S,
    ids: std::vec::IntoIter<u32>,
    total: usize,
    done: usize,
    progress: Option<&'a dyn Fn(usize, usize)>,
}

impl<'a, S: MailSource> HeaderStream<'a, S> {
    pub fn new(source: &'a mut S, ids: Vec<u32>, progress: Option<&'a dyn Fn(usize, usize)>) -> Self {
        Self {
            source,
            total: ids.len(),
            ids: ids.into_iter(),
            done: 0,
            progress,
        }
    }

    /// Number of identifiers this stream will visit.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<S: MailSource> Iterator for HeaderStream<'_, S> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        let result = self.source.fetch_header(id).map(|header| match header {
            Some(bytes) => record_from_headers(&bytes),
            None => {
                debug!(id, "No header data returned, keeping an empty record");
                RawRecord::default()
            }
        });

        self.done += 1;
        if let Some(progress) = self.progress {
            progress(self.done, self.total);
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}
