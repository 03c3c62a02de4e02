//! Row writer for TOON output

use crate::constants::FIELD_SEPARATOR;
use crate::shared::sanitize_field;
use crate::types::{ToonError, ToonResult};

/// Writes a fixed-column table, one line per row.
///
/// Every field goes through [`sanitize_field`], so no value can break the
/// row structure.
pub struct TableWriter {
    columns: usize,
    lines: Vec<String>,
}

impl TableWriter {
    pub fn new(header: &[&str]) -> Self {
        Self {
            columns: header.len(),
            lines: vec![header.join(FIELD_SEPARATOR)],
        }
    }

    /// Appends one row. The number of fields must match the header.
    pub fn push_row<S: AsRef<str>>(&mut self, fields: &[S]) -> ToonResult<()> {
        if fields.len() != self.columns {
            return Err(ToonError::ColumnMismatch {
                expected: self.columns,
                actual: fields.len(),
            });
        }
        let row = fields
            .iter()
            .map(|field| sanitize_field(field.as_ref()).trim().to_string())
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR);
        self.lines.push(row);
        Ok(())
    }

    /// Number of data rows written so far.
    pub fn row_count(&self) -> usize {
        self.lines.len() - 1
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_header_and_rows() {
        let mut writer = TableWriter::new(&["rating", "snippet"]);
        writer.push_row(&["5", "great | fast\napp"]).unwrap();
        assert_eq!(writer.row_count(), 1);
        assert_eq!(writer.finish(), "rating | snippet\n5 | great   fast app");
    }

    #[test]
    fn test_writer_rejects_wrong_width() {
        let mut writer = TableWriter::new(&["a", "b", "c"]);
        let err = writer.push_row(&["1"]).unwrap_err();
        assert!(matches!(err, ToonError::ColumnMismatch { expected: 3, actual: 1 }));
    }
}
