// Export selection and rendering.
// Serializes accumulated rows as a CSV attachment or re-emits the
// merged raw page structure.

use serde_json::Value;

use crate::fetch::rows::{TWEET_COLUMNS, TweetRow, USER_COLUMNS, UserRow};

/// Longest filename stem derived from user input.
const FILENAME_STEM_MAX: usize = 50;

/// A rendered response body for the service boundary.
#[derive(Debug)]
pub enum Export {
    /// Merged raw JSON payload.
    Raw(Value),
    /// A downloadable tabular document.
    Attachment {
        filename: String,
        content_type: &'static str,
        body: String,
    },
}

impl Export {
    /// CSV attachment over tweet rows. The header row is always
    /// emitted; a zero-row export is valid, not an error.
    pub fn tweet_csv(rows: &[TweetRow], filename: String) -> Self {
        let body = csv_document(&TWEET_COLUMNS, rows.iter().map(TweetRow::cells));
        Export::Attachment {
            filename,
            content_type: "text/csv; charset=utf-8",
            body,
        }
    }

    /// CSV attachment over a single user-profile row.
    pub fn user_csv(row: &UserRow, filename: String) -> Self {
        let body = csv_document(&USER_COLUMNS, std::iter::once(row.cells()));
        Export::Attachment {
            filename,
            content_type: "text/csv; charset=utf-8",
            body,
        }
    }
}

/// Derive a filename-safe stem from a query or username: spaces become
/// underscores and the stem is truncated to a bounded length.
pub fn safe_stem(raw: &str, fallback: &str) -> String {
    let stem: String = raw.replace(' ', "_").chars().take(FILENAME_STEM_MAX).collect();
    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem
    }
}

/// Serialize rows under a fixed header with RFC 4180 quoting.
fn csv_document<I>(columns: &[&str], rows: I) -> String
where
    I: Iterator<Item = Vec<String>>,
{
    let mut out = String::new();
    write_record(&mut out, columns.iter().map(|c| (*c).to_string()));
    for cells in rows {
        write_record(&mut out, cells.into_iter());
    }
    out
}

fn write_record<I: Iterator<Item = String>>(out: &mut String, cells: I) {
    let encoded: Vec<String> = cells.map(|cell| escape_cell(&cell)).collect();
    out.push_str(&encoded.join(","));
    out.push_str("\r\n");
}

/// Quote a cell when it contains a delimiter, quote, or line break.
fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
