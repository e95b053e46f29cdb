//! The ordered message table that flows between pipeline stages.

/// An ordered, immutable sequence of records.
///
/// Row order is fetch order. Stages never remove rows: they build a new
/// table from the previous one with [`MessageTable::map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTable<R> {
    rows: Vec<R>,
}

impl<R> MessageTable<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Derive a new table row by row; length and order are preserved.
    pub fn map<B>(&self, f: impl FnMut(&R) -> B) -> MessageTable<B> {
        MessageTable {
            rows: self.rows.iter().map(f).collect(),
        }
    }
}

impl<R> Default for MessageTable<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R> FromIterator<R> for MessageTable<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a, R> IntoIterator for &'a MessageTable<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
