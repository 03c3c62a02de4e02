//! String manipulation utilities

use crate::constants::{BACKSLASH, CARRIAGE_RETURN, DOUBLE_QUOTE, NEWLINE, PIPE, PIPE_ESCAPE, SPACE};

/// Makes a value safe to place in a single field.
///
/// Pipes and line breaks are each replaced by one space, so the value can
/// never split a row or start a new one.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            PIPE | NEWLINE | CARRIAGE_RETURN => SPACE,
            other => other,
        })
        .collect()
}

/// Escapes literal pipes with the `[PIPE]` marker.
pub fn escape_pipes(value: &str) -> String {
    value.replace(PIPE, PIPE_ESCAPE)
}

/// Restores free text read from a field.
///
/// `[PIPE]` markers become `|`, and double quotes and backslashes are dropped.
pub fn restore_text(value: &str) -> String {
    value
        .replace(PIPE_ESCAPE, "|")
        .chars()
        .filter(|ch| *ch != DOUBLE_QUOTE && *ch != BACKSLASH)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Case-insensitive check that `line` contains every word in `words`.
pub fn contains_all_words(line: &str, words: &[&str]) -> bool {
    let lowered = line.to_lowercase();
    words.iter().all(|word| lowered.contains(&word.to_lowercase()))
}
