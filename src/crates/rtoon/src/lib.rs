//! rToon - pipe-delimited table codec
//!
//! TOON rows are compact `|`-separated lines under a single header row. They
//! are cheap to embed in a prompt and easy for a model to produce, but the
//! text that comes back is rarely clean: preambles, stray header repeats and
//! short rows are all expected. This crate sanitizes every field it writes
//! and reads tables tolerantly.
//!
//! # Example
//!
//! ```rust
//! use rtoon::{parse_table, TableWriter};
//!
//! let mut writer = TableWriter::new(&["type", "category", "title"]);
//! writer.push_row(&["bug", "crash", "Crashes | on launch"]).unwrap();
//! let text = writer.finish();
//!
//! let table = parse_table(&text, &["type", "category", "title"]);
//! assert_eq!(table.rows[0].field(2), Some("Crashes   on launch"));
//! ```

pub mod constants;
pub mod decode;
pub mod encode;
pub mod shared;
pub mod types;

pub use constants::{FIELD_SEPARATOR, PIPE_ESCAPE};
pub use decode::{locate_header, merge_tables, parse_list_field, parse_table, split_fields, HeaderPosition};
pub use encode::TableWriter;
pub use shared::{contains_all_words, escape_pipes, restore_text, sanitize_field};
pub use types::{Row, Table, ToonError, ToonResult};

/// Encode rows under `header` into TOON text
///
/// # Arguments
///
/// * `header` - Column names, written as the first line
/// * `rows` - Data rows; each must have one field per column
///
/// # Returns
///
/// The table text, or an error if a row has the wrong width
pub fn encode_rows<S: AsRef<str>>(header: &[&str], rows: &[Vec<S>]) -> ToonResult<String> {
    let mut writer = TableWriter::new(header);
    for row in rows {
        writer.push_row(row)?;
    }
    Ok(writer.finish())
}
