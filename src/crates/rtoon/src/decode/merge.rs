//! Merging of tables produced in several replies

use crate::decode::scanner::{locate_header, HeaderPosition};
use crate::shared::contains_all_words;

/// Concatenates several replies into one table.
///
/// Only the first header row encountered is kept. Later header rows are
/// dropped rather than read as data, and text before a reply's header is
/// discarded. Data rows keep their order.
pub fn merge_tables<S: AsRef<str>>(replies: &[S], header_words: &[&str]) -> String {
    let mut merged: Vec<&str> = Vec::new();
    let mut header_written = false;

    for reply in replies {
        let reply = reply.as_ref();
        let start = match locate_header(reply, header_words) {
            HeaderPosition::Matched(n) => n,
            HeaderPosition::Fallback(_) => 1,
            HeaderPosition::Empty => continue,
        };

        for (i, line) in reply.lines().enumerate() {
            let line_number = i + 1;
            if line_number < start || line.trim().is_empty() {
                continue;
            }
            if contains_all_words(line, header_words) {
                if header_written {
                    continue;
                }
                header_written = true;
            }
            merged.push(line.trim());
        }
    }

    merged.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &[&str] = &["type", "category", "title"];

    #[test]
    fn test_merge_keeps_first_header() {
        let a = "type|category|title\nbug|a|one\nbug|b|two";
        let b = "Sure, here you go:\ntype|category|title\npain_point|c|three";
        let merged = merge_tables(&[a, b], WORDS);
        assert_eq!(
            merged,
            "type|category|title\nbug|a|one\nbug|b|two\npain_point|c|three"
        );
    }

    #[test]
    fn test_merge_reply_without_header() {
        let merged = merge_tables(&["type|category|title\nbug|a|one", "bug|b|two"], WORDS);
        assert_eq!(merged, "type|category|title\nbug|a|one\nbug|b|two");
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(merge_tables::<&str>(&[], WORDS), "");
        assert_eq!(merge_tables(&["", "\n"], WORDS), "");
    }
}
