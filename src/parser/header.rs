//! Header text handling: raw byte decoding, folding, RFC 2047 encoded-words,
//! and coercive date parsing.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

/// Decode `bytes` with a declared charset label.
///
/// Any label known to `encoding_rs` is accepted (`iso-8859-1`, `koi8-r`,
/// `windows-1252`, ...). Without a label, or with an unknown one, the bytes
/// are read as UTF-8 with invalid sequences replaced. Never fails.
pub fn decode_with_charset(bytes: &[u8], declared: Option<&str>) -> String {
    let Some(label) = declared.map(str::trim).filter(|l| !l.is_empty()) else {
        return String::from_utf8_lossy(bytes).into_owned();
    };

    // RFC 2231 allows a language suffix: "utf-8*en"
    let label = label.split('*').next().unwrap_or(label);

    match label.to_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        _ => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            }
            None => {
                warn!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
                String::from_utf8_lossy(bytes).into_owned()
            }
        },
    }
}

/// Return the charset declared by the first encoded-word in `raw`, if any.
///
/// `"Re: =?ISO-8859-1?Q?caf=E9?="` → `Some("ISO-8859-1")`
pub fn declared_charset(raw: &str) -> Option<String> {
    let mut remaining = raw;
    while let Some(start) = remaining.find("=?") {
        let after = &remaining[start + 2..];
        if let Some(word) = split_encoded_word(after) {
            return Some(word.charset.to_string());
        }
        remaining = after;
    }
    None
}

/// Turn a raw header block (as received from the server) into text.
///
/// Header bytes are normally 7-bit, but some senders emit raw 8-bit text.
/// Those bytes are read with the charset of the first encoded-word found in
/// the block, else as UTF-8, else as Windows-1252 (which accepts every byte).
pub fn decode_raw_header(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if bytes.is_ascii() {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let ascii_view = String::from_utf8_lossy(bytes);
    let declared = declared_charset(&ascii_view)
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()))
        .filter(|encoding| encoding.is_ascii_compatible());
    if let Some(encoding) = declared {
        let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
        if !had_errors {
            return decoded.into_owned();
        }
        debug!(charset = encoding.name(), "Header bytes invalid in declared charset");
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    decoded.into_owned()
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs in header order.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            // End of the header block
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

/// Get the first value for a header name (case-insensitive).
pub fn get_header(headers: &[(String, String)], name: &str) -> Option<String> {
    let name = name.to_lowercase();
    headers
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.clone())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Each word is decoded with its own declared charset. Whitespace between two
/// adjacent encoded-words is dropped (RFC 2047 §6.2). A malformed word is
/// kept verbatim, so plain text always comes back unchanged.
pub fn decode_header_value(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        match split_encoded_word(after_start).and_then(|w| w.decode().map(|t| (t, w.consumed))) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &after_start[consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// The three parts of an encoded-word, borrowed from the header text.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
    /// Bytes consumed from the string *after* the initial `=?`.
    consumed: usize,
}

impl EncodedWord<'_> {
    fn decode(&self) -> Option<String> {
        let bytes = match self.encoding.to_ascii_uppercase().as_str() {
            "B" => {
                let compact: String = self.text.chars().filter(|c| !c.is_whitespace()).collect();
                general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))
                    .ok()?
            }
            "Q" => decode_q_encoding(self.text),
            _ => return None,
        };
        Some(decode_with_charset(&bytes, Some(self.charset)))
    }
}

/// Split `charset?encoding?text?=` (the part after `=?`).
fn split_encoded_word(s: &str) -> Option<EncodedWord<'_>> {
    let first_q = s.find('?')?;
    let charset = &s[..first_q];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;

    Some(EncodedWord {
        charset,
        encoding,
        text: &rest2[..end],
        consumed: first_q + 1 + second_q + 1 + end + 2,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Parse an email date string, coercively.
///
/// Supports RFC 2822, ISO 8601, trailing comments such as `(UTC)`, and many
/// broken real-world variants. The sender's UTC offset is preserved; forms
/// without an offset are taken as UTC. Returns `None` when nothing matches.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = strip_trailing_comment(date_str.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }

    let no_dow = strip_day_of_week(trimmed);
    let no_dow_normalized = normalize_imap_date(&no_dow);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    for candidate in [&no_dow, &no_dow_normalized] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt);
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt).fixed_offset());
            }
        }
    }

    for candidate in [&no_dow, &no_dow_normalized] {
        let replaced = replace_named_tz(candidate);
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&replaced, fmt) {
                return Some(dt);
            }
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt).ok()
}

/// Drop a trailing parenthesized comment: `"... +0000 (UTC)"` → `"... +0000"`.
fn strip_trailing_comment(s: &str) -> &str {
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            return s[..open].trim_end();
        }
    }
    s
}

/// Normalize IMAP-style dates: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    if !s.contains('-') {
        return s.to_string();
    }

    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    for (pos, _) in s.char_indices() {
        // "-Jul-": both dashes are ASCII, so bytes 1 and 4 are char boundaries
        let Some(window) = s.get(pos..pos + 5) else {
            continue;
        };
        if !window.starts_with('-') || !window.ends_with('-') {
            continue;
        }
        if let Some(month) = MONTHS.iter().find(|m| window[1..4].eq_ignore_ascii_case(m)) {
            return format!("{} {month} {}", &s[..pos], &s[pos + 5..]);
        }
    }

    s.to_string()
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            if rest.starts_with(',') || rest.starts_with(' ') {
                return rest.trim_start_matches(',').trim().to_string();
            }
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    const TZS: [(&str, &str); 14] = [
        ("CEST", "+0200"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("UT", "+0000"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    for (name, offset) in TZS {
        if let Some(head) = s.strip_suffix(name) {
            return format!("{head}{offset}");
        }
    }
    s.to_string()
}
