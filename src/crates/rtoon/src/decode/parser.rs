//! TOON row parsing

use crate::constants::{CLOSE_BRACKET, COMMA, OPEN_BRACKET, PIPE};
use crate::decode::scanner::{locate_header, HeaderPosition, LineCursor};
use crate::types::{Row, Table};

/// Splits a row on `|` and trims every field.
pub fn split_fields(line: &str) -> Vec<String> {
    line.split(PIPE).map(|field| field.trim().to_string()).collect()
}

/// Parses a table whose header row contains `header_words`.
///
/// Every non-blank line after the header becomes a [`Row`]. Rows are not
/// checked against the header width; short rows are left for the caller to
/// judge.
pub fn parse_table(source: &str, header_words: &[&str]) -> Table {
    let position = locate_header(source, header_words);
    let mut cursor = LineCursor::new(source);
    let mut table = Table {
        header_matched: matches!(position, HeaderPosition::Matched(_)),
        ..Table::default()
    };

    if let Some(header_line) = position.line_number() {
        while let Some(line) = cursor.next() {
            if line.line_number == header_line {
                table.header = Some(line.content.trim().to_string());
                break;
            }
        }
    }

    while let Some(line) = cursor.next() {
        table.rows.push(Row {
            line_number: line.line_number,
            fields: split_fields(line.content),
        });
    }
    table
}

/// Reads a list-valued field.
///
/// A JSON array of strings is tried first; otherwise the field is split on
/// commas, with surrounding brackets removed. Empty items are dropped.
pub fn parse_list_field(field: &str) -> Vec<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
        return values
            .into_iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|item| !item.trim().is_empty())
            .collect();
    }

    trimmed
        .trim_start_matches(OPEN_BRACKET)
        .trim_end_matches(CLOSE_BRACKET)
        .split(COMMA)
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
