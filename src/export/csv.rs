//! Delimited-text snapshots of the message table.
//!
//! Output is UTF-8 with `\n` line endings. A field is quoted (RFC 4180) only
//! when it contains the delimiter, a double quote, or a line break, so a file
//! read back with [`read_delimited`] and written again is byte-identical.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{MailcloudError, Result};
use crate::model::table::MessageTable;

/// A record type that can be written as one delimited row.
pub trait Row: Sized {
    /// Column names, in output order.
    const HEADERS: &'static [&'static str];

    /// One cell per header; null values are empty strings.
    fn cells(&self) -> Vec<String>;

    /// Rebuild a record from cells read back from a snapshot.
    fn from_cells(cells: &[String]) -> std::result::Result<Self, String>;
}

/// Options for one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field separator.
    pub delimiter: char,
    /// Prefix the file with a UTF-8 BOM (for spreadsheet tools).
    pub utf8_bom: bool,
}

impl CsvOptions {
    pub fn comma() -> Self {
        Self {
            delimiter: ',',
            utf8_bom: false,
        }
    }

    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            utf8_bom: false,
        }
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self::comma()
    }
}

/// Header names and raw cells of a delimited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Write `table` to `output_path`, replacing any existing file.
pub fn export_table<R: Row>(
    table: &MessageTable<R>,
    output_path: &Path,
    options: &CsvOptions,
) -> Result<()> {
    let file =
        std::fs::File::create(output_path).map_err(|e| MailcloudError::io(output_path, e))?;
    let mut writer = std::io::BufWriter::new(file);

    write_table(table, &mut writer, options)
        .and_then(|_| writer.flush())
        .map_err(|e| MailcloudError::io(output_path, e))?;

    info!(
        path = %output_path.display(),
        rows = table.len(),
        delimiter = %options.delimiter,
        "Exported table"
    );
    Ok(())
}

/// Serialize `table` into any writer.
pub fn write_table<R: Row, W: Write>(
    table: &MessageTable<R>,
    out: &mut W,
    options: &CsvOptions,
) -> std::io::Result<()> {
    if options.utf8_bom {
        out.write_all(&[0xEF, 0xBB, 0xBF])?;
    }

    let headers: Vec<String> = R::HEADERS.iter().map(|h| h.to_string()).collect();
    write_row(out, &headers, options.delimiter)?;

    for record in table {
        write_row(out, &record.cells(), options.delimiter)?;
    }
    Ok(())
}

/// Serialize `table` into a string.
pub fn to_delimited_string<R: Row>(table: &MessageTable<R>, options: &CsvOptions) -> String {
    let mut buf = Vec::new();
    write_table(table, &mut buf, options).expect("writing to a Vec cannot fail");
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_row<W: Write>(out: &mut W, cells: &[String], delimiter: char) -> std::io::Result<()> {
    let line = cells
        .iter()
        .map(|c| escape_field(c, delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string());
    writeln!(out, "{line}")
}

/// Escape a value for delimited output (RFC 4180).
///
/// Wraps in double quotes if the value contains the delimiter, quotes, or newlines.
pub fn escape_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Read a delimited file written by [`export_table`] (or any RFC 4180 file).
pub fn read_delimited(path: &Path, delimiter: char) -> Result<DelimitedTable> {
    let bytes = std::fs::read(path).map_err(|e| MailcloudError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);

    let mut records = parse_delimited(text, delimiter).map_err(|(line, reason)| {
        MailcloudError::MalformedTable {
            path: path.to_path_buf(),
            line,
            reason,
        }
    })?;

    if records.is_empty() {
        return Err(MailcloudError::MalformedTable {
            path: path.to_path_buf(),
            line: 1,
            reason: "missing header row".to_string(),
        });
    }

    let headers = records.remove(0);
    Ok(DelimitedTable {
        headers,
        rows: records,
    })
}

/// Read a snapshot back into a typed table, checking its header row.
pub fn load_table<R: Row>(path: &Path, delimiter: char) -> Result<MessageTable<R>> {
    let raw = read_delimited(path, delimiter)?;

    if raw.headers != R::HEADERS {
        return Err(MailcloudError::MalformedTable {
            path: path.to_path_buf(),
            line: 1,
            reason: format!(
                "expected columns {:?}, found {:?}",
                R::HEADERS,
                raw.headers
            ),
        });
    }

    raw.rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            R::from_cells(cells).map_err(|reason| MailcloudError::MalformedTable {
                path: path.to_path_buf(),
                line: i + 2,
                reason,
            })
        })
        .collect::<Result<Vec<R>>>()
        .map(MessageTable::new)
}

/// Split text into records of fields. Errors carry the 1-based line number.
fn parse_delimited(
    text: &str,
    delimiter: char,
) -> std::result::Result<Vec<Vec<String>>, (usize, String)> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
                line += 1;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err((quote_line, "unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_simple() {
        assert_eq!(escape_field("hello", ','), "hello");
    }

    #[test]
    fn test_escape_delimiter() {
        assert_eq!(escape_field("hello, world", ','), "\"hello, world\"");
        assert_eq!(escape_field("hello, world", '|'), "hello, world");
        assert_eq!(escape_field("a|b", '|'), "\"a|b\"");
    }

    #[test]
    fn test_escape_quotes_and_newline() {
        assert_eq!(escape_field("say \"hi\"", ','), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line1\nline2", '|'), "\"line1\nline2\"");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let text = "A|B\n\"x|y\"|\"say \"\"hi\"\"\"\nplain|\n";
        let records = parse_delimited(text, '|').unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], vec!["x|y", "say \"hi\""]);
        assert_eq!(records[2], vec!["plain", ""]);
    }

    #[test]
    fn test_parse_multiline_field_and_crlf() {
        let text = "A,B\r\n\"one\ntwo\",3\r\n";
        let records = parse_delimited(text, ',').unwrap();
        assert_eq!(records[1], vec!["one\ntwo", "3"]);
    }

    #[test]
    fn test_parse_unterminated_quote() {
        let err = parse_delimited("A,B\nok,\"broken\n", ',').unwrap_err();
        assert_eq!(err.0, 2);
    }
}
