//! Word counting over subject lines.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::record::FinalRecord;
use crate::model::table::MessageTable;

use super::stopwords::StopWords;

/// Word → occurrence count. Transient: only used to draw the cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFrequencies {
    counts: BTreeMap<String, usize>,
}

impl WordFrequencies {
    pub fn get(&self, word: &str) -> usize {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// The `n` most frequent words, ties broken alphabetically.
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut sorted: Vec<(&str, usize)> =
            self.counts.iter().map(|(w, &c)| (w.as_str(), c)).collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        sorted.truncate(n);
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(w, &c)| (w.as_str(), c))
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\w[\w']+").expect("valid token regex"))
}

/// Count words across all subjects.
///
/// Text is case-folded and split into runs of two or more word characters
/// (apostrophes allowed inside). A trailing `'s` is dropped; pure numbers
/// and stopwords are skipped.
pub fn word_frequencies<'a, I>(subjects: I, stopwords: &StopWords) -> WordFrequencies
where
    I: IntoIterator<Item = &'a str>,
{
    let text = subjects
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut counts = BTreeMap::new();
    for m in token_regex().find_iter(&text) {
        let token = m.as_str();
        let token = token.strip_suffix("'s").unwrap_or(token).trim_end_matches('\'');
        if token.chars().count() < 2
            || token.chars().all(|c| c.is_numeric())
            || stopwords.contains(token)
        {
            continue;
        }
        *counts.entry(token.to_string()).or_insert(0) += 1;
    }

    WordFrequencies { counts }
}

/// Count words across the non-null subjects of a final table.
pub fn subject_frequencies(
    table: &MessageTable<FinalRecord>,
    stopwords: &StopWords,
) -> WordFrequencies {
    word_frequencies(table.iter().filter_map(|r| r.subject.as_deref()), stopwords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopword_only_subjects_contribute_nothing() {
        let freqs = word_frequencies(["Re: Fwd:", "RE: re: FW:", "Subject"], &StopWords::standard());
        assert!(freqs.is_empty());
    }

    #[test]
    fn test_counts_are_case_folded() {
        let freqs = word_frequencies(
            ["Invoice March", "Re: invoice April", "INVOICE overdue"],
            &StopWords::standard(),
        );
        assert_eq!(freqs.get("invoice"), 3);
        assert_eq!(freqs.get("march"), 1);
        assert_eq!(freqs.top(1), vec![("invoice", 3)]);
    }

    #[test]
    fn test_numbers_possessives_and_single_letters() {
        let freqs = word_frequencies(["Order 12345 for Anna's team x"], &StopWords::standard());
        assert_eq!(freqs.get("12345"), 0);
        assert_eq!(freqs.get("anna"), 1);
        assert_eq!(freqs.get("x"), 0);
        assert_eq!(freqs.get("order"), 1);
    }

    #[test]
    fn test_unicode_words() {
        let freqs = word_frequencies(["Réunion équipe", "réunion"], &StopWords::standard());
        assert_eq!(freqs.get("réunion"), 2);
        assert_eq!(freqs.total(), 3);
    }

    #[test]
    fn test_top_ties_alphabetical() {
        let freqs = word_frequencies(["beta alpha gamma"], &StopWords::standard());
        assert_eq!(freqs.top(2), vec![("alpha", 1), ("beta", 1)]);
    }
}
