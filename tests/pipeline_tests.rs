//! Integration tests for the fetch → enrich → split → export pipeline.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mailcloud::cloud::frequency::{subject_frequencies, word_frequencies};
use mailcloud::cloud::stopwords::StopWords;
use mailcloud::config::{ClockMode, Config};
use mailcloud::error::{MailcloudError, Result};
use mailcloud::export::csv::{load_table, to_delimited_string, CsvOptions};
use mailcloud::fetch::MailSource;
use mailcloud::model::record::{FinalRecord, RawRecord, TimedRecord};
use mailcloud::pipeline::{self, build::fetch_table};

/// In-memory mailbox: folder name → `(id, header block)`.
#[derive(Default)]
struct FakeSource {
    folders: HashMap<String, Vec<(u32, Option<Vec<u8>>)>>,
    selected: Option<String>,
    fail_on: Option<u32>,
    fetched: Rc<RefCell<Vec<u32>>>,
    logged_out: Rc<Cell<bool>>,
}

impl FakeSource {
    fn with_folder(name: &str, messages: Vec<(u32, Option<&str>)>) -> Self {
        let mut folders = HashMap::new();
        folders.insert(
            name.to_string(),
            messages
                .into_iter()
                .map(|(id, h)| (id, h.map(|s| s.as_bytes().to_vec())))
                .collect(),
        );
        Self {
            folders,
            ..Default::default()
        }
    }
}

impl MailSource for FakeSource {
    fn message_ids(&mut self, folder: &str) -> Result<Vec<u32>> {
        let messages = self
            .folders
            .get(folder)
            .ok_or_else(|| MailcloudError::FolderNotFound(folder.to_string()))?;
        self.selected = Some(folder.to_string());
        Ok(messages.iter().map(|(id, _)| *id).collect())
    }

    fn fetch_header(&mut self, id: u32) -> Result<Option<Vec<u8>>> {
        if self.fail_on == Some(id) {
            return Err(MailcloudError::Imap("connection reset".into()));
        }
        self.fetched.borrow_mut().push(id);
        let folder = self.selected.as_ref().expect("folder selected before fetch");
        Ok(self.folders[folder]
            .iter()
            .find(|(i, _)| *i == id)
            .and_then(|(_, h)| h.clone()))
    }

    fn logout(self) -> Result<()> {
        self.logged_out.set(true);
        Ok(())
    }
}

const JANE: &str = "Date: Mon, 9 Sep 2024 09:15:00 +0200\r\n\
From: \"Jane Doe\" <jane@x.com>\r\n\
Subject: Quarterly report, review\r\n\r\n";

const PLAIN: &str = "Date: not a date\r\n\
From: plain@x.com\r\n\
Subject: =?UTF-8?B?Sm9zw6kgR2FyY8OtYQ==?=\r\n\r\n";

const JOSE: &str = "Date: Sun, 15 Sep 2024 23:30:00 +0000\r\n\
From: =?UTF-8?B?Sm9zw6kgR2FyY8OtYQ==?= <jose@y.org>\r\n\
Subject: Re: Fwd:\r\n\r\n";

fn inbox() -> FakeSource {
    FakeSource::with_folder("INBOX", vec![(1, Some(JANE)), (2, Some(PLAIN)), (3, Some(JOSE))])
}

const RAW_CSV: &str = "Date,From,Subject\n\
\"Sun, 15 Sep 2024 23:30:00 +0000\",=?UTF-8?B?Sm9zw6kgR2FyY8OtYQ==?= <jose@y.org>,Re: Fwd:\n\
not a date,plain@x.com,José García\n\
\"Mon, 9 Sep 2024 09:15:00 +0200\",\"\"\"Jane Doe\"\" <jane@x.com>\",\"Quarterly report, review\"\n";

const CLEANED_CSV: &str = "Date,From,Subject,H_M_S,Hour,WeekDay\n\
2024-09-15,=?UTF-8?B?Sm9zw6kgR2FyY8OtYQ==?= <jose@y.org>,Re: Fwd:,23:30:00,23h-24h,Sunday\n\
,plain@x.com,José García,,,\n\
2024-09-09,\"\"\"Jane Doe\"\" <jane@x.com>\",\"Quarterly report, review\",09:15:00,09h-10h,Monday\n";

const FINAL_CSV: &str = "Date|Subject|H_M_S|Hour|WeekDay|Mail|Name\n\
2024-09-15|Re: Fwd:|23:30:00|23h-24h|Sunday|jose@y.org|José García\n\
|José García||||plain@x.com|plain@x.com\n\
2024-09-09|Quarterly report, review|09:15:00|09h-10h|Monday|jane@x.com|Jane Doe\n";

// ─── Fetch ──────────────────────────────────────────────────────────

#[test]
fn test_one_record_per_identifier_newest_first() {
    let source = inbox();
    let fetched = Rc::clone(&source.fetched);
    let logged_out = Rc::clone(&source.logged_out);

    let table = fetch_table(source, "INBOX", true, None).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(*fetched.borrow(), vec![3, 2, 1]);
    assert!(logged_out.get());
    assert_eq!(table.rows()[0].subject.as_deref(), Some("Re: Fwd:"));
    assert_eq!(table.rows()[1].subject.as_deref(), Some("José García"));
}

#[test]
fn test_oldest_first_and_progress() {
    let source = inbox();
    let fetched = Rc::clone(&source.fetched);
    let calls = RefCell::new(Vec::new());

    let table = fetch_table(
        source,
        "INBOX",
        false,
        Some(&|done, total| calls.borrow_mut().push((done, total))),
    )
    .unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(*fetched.borrow(), vec![1, 2, 3]);
    assert_eq!(*calls.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn test_message_without_headers_is_kept_as_empty_row() {
    let source = FakeSource::with_folder("INBOX", vec![(1, Some(JANE)), (2, None)]);
    let table = fetch_table(source, "INBOX", false, None).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[1], RawRecord::default());
}

#[test]
fn test_folder_not_found_still_logs_out() {
    let source = inbox();
    let logged_out = Rc::clone(&source.logged_out);

    let err = fetch_table(source, "Archive", true, None).unwrap_err();

    assert!(matches!(err, MailcloudError::FolderNotFound(ref f) if f == "Archive"));
    assert!(logged_out.get());
}

#[test]
fn test_fetch_failure_aborts_run() {
    let mut source = inbox();
    source.fail_on = Some(2);
    let logged_out = Rc::clone(&source.logged_out);

    let err = fetch_table(source, "INBOX", true, None).unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert!(logged_out.get());
}

// ─── Snapshots ──────────────────────────────────────────────────────

#[test]
fn test_three_snapshots_contents() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();

    let processed = pipeline::process(&raw, tmp.path(), &Config::default()).unwrap();

    assert_eq!(processed.files.len(), 3);
    assert_eq!(processed.finals.len(), 3);
    tmp.child("emails.csv").assert(RAW_CSV);
    tmp.child("emails_cleaned.csv").assert(CLEANED_CSV);
    tmp.child("emails_final.csv").assert(FINAL_CSV);
}

#[test]
fn test_every_file_keeps_undated_rows() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();
    pipeline::process(&raw, tmp.path(), &Config::default()).unwrap();

    for (name, lines) in [
        ("emails.csv", 4),
        ("emails_cleaned.csv", 4),
        ("emails_final.csv", 4),
    ] {
        let contents = std::fs::read_to_string(tmp.path().join(name)).unwrap();
        assert_eq!(contents.lines().count(), lines, "{name}");
    }
    tmp.child("emails_cleaned.csv")
        .assert(predicate::str::contains(",plain@x.com,José García,,,\n"));
}

#[test]
fn test_utc_clock_and_bom() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut config = Config::default();
    config.enrich.clock = ClockMode::Utc;
    config.export.utf8_bom = true;

    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();
    pipeline::process(&raw, tmp.path(), &config).unwrap();

    let bytes = std::fs::read(tmp.path().join("emails_final.csv")).unwrap();
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    // 09:15 at +0200 is 07:15 UTC
    tmp.child("emails_final.csv")
        .assert(predicate::str::contains("|07:15:00|07h-8h|Monday|jane@x.com|"));
}

#[test]
fn test_final_snapshot_byte_round_trip() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();
    pipeline::process(&raw, tmp.path(), &Config::default()).unwrap();

    let path = tmp.path().join("emails_final.csv");
    let loaded = load_table::<FinalRecord>(&path, '|').unwrap();
    let rewritten = to_delimited_string(&loaded, &CsvOptions::with_delimiter('|'));

    assert_eq!(rewritten, std::fs::read_to_string(&path).unwrap());
}

#[test]
fn test_rebuild_from_raw_snapshot_matches() {
    let first = assert_fs::TempDir::new().unwrap();
    let second = assert_fs::TempDir::new().unwrap();
    let config = Config::default();

    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();
    pipeline::process(&raw, first.path(), &config).unwrap();

    let reloaded = load_table::<RawRecord>(&first.path().join("emails.csv"), ',').unwrap();
    assert_eq!(reloaded, raw);
    pipeline::process(&reloaded, second.path(), &config).unwrap();

    second.child("emails_final.csv").assert(FINAL_CSV);
    let cleaned = load_table::<TimedRecord>(&second.path().join("emails_cleaned.csv"), ',').unwrap();
    assert_eq!(cleaned.len(), 3);
}

#[test]
fn test_rerun_overwrites_previous_snapshots() {
    let reused = assert_fs::TempDir::new().unwrap();
    let fresh = assert_fs::TempDir::new().unwrap();
    let config = Config::default();

    let long = fetch_table(inbox(), "INBOX", true, None).unwrap();
    pipeline::process(&long, reused.path(), &config).unwrap();

    let single = FakeSource::with_folder("INBOX", vec![(1, Some(JANE))]);
    let short = fetch_table(single, "INBOX", true, None).unwrap();
    assert_eq!(short.len(), 1);
    pipeline::process(&short, reused.path(), &config).unwrap();
    pipeline::process(&short, fresh.path(), &config).unwrap();

    for name in ["emails.csv", "emails_cleaned.csv", "emails_final.csv"] {
        let rewritten = std::fs::read(reused.path().join(name)).unwrap();
        let expected = std::fs::read(fresh.path().join(name)).unwrap();
        assert_eq!(rewritten, expected, "{name}");
        assert_eq!(String::from_utf8(rewritten).unwrap().lines().count(), 2, "{name}");
    }
    reused.child("emails_final.csv").assert(
        "Date|Subject|H_M_S|Hour|WeekDay|Mail|Name\n\
2024-09-09|Quarterly report, review|09:15:00|09h-10h|Monday|jane@x.com|Jane Doe\n",
    );
}

#[test]
fn test_load_rejects_wrong_header() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("emails_final.csv");
    file.write_str("Date,From,Subject\n2024-01-01,a@b.c,Hi\n").unwrap();

    let err = load_table::<FinalRecord>(file.path(), '|').unwrap_err();
    assert!(matches!(err, MailcloudError::MalformedTable { .. }));
}

#[test]
fn test_export_into_missing_parent_fails() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let blocker = tmp.child("not_a_dir");
    blocker.write_str("occupied").unwrap();

    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();
    let err = pipeline::process(&raw, &blocker.path().join("out"), &Config::default()).unwrap_err();
    assert_eq!(err.stage(), "export");
}

// ─── Word cloud input ───────────────────────────────────────────────

#[test]
fn test_stopword_only_subjects_add_no_words() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let raw = fetch_table(inbox(), "INBOX", true, None).unwrap();
    let processed = pipeline::process(&raw, tmp.path(), &Config::default()).unwrap();

    let stopwords = StopWords::standard();
    let all = subject_frequencies(&processed.finals, &stopwords);
    let without_noise = word_frequencies(
        processed
            .finals
            .iter()
            .filter_map(|r| r.subject.as_deref())
            .filter(|s| *s != "Re: Fwd:"),
        &stopwords,
    );

    assert_eq!(all, without_noise);
    assert_eq!(all.get("quarterly"), 1);
    assert_eq!(all.get("garcía"), 1);
    assert_eq!(all.get("re"), 0);
}
