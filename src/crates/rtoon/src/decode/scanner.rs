//! Line scanner for TOON input

use crate::shared::contains_all_words;

/// A source line with its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    pub line_number: usize,
    pub content: &'a str,
}

/// A cursor over the non-blank lines of a text.
pub struct LineCursor<'a> {
    lines: Vec<ScannedLine<'a>>,
    index: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, content)| ScannedLine {
                line_number: i + 1,
                content,
            })
            .collect();
        Self { lines, index: 0 }
    }

    pub fn peek(&self) -> Option<ScannedLine<'a>> {
        self.lines.get(self.index).copied()
    }

    pub fn next(&mut self) -> Option<ScannedLine<'a>> {
        let line = self.peek();
        if line.is_some() {
            self.index += 1;
        }
        line
    }

    pub fn at_end(&self) -> bool {
        self.index >= self.lines.len()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Where the header row of a table sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPosition {
    /// A line containing every header word, at this 1-based line number
    Matched(usize),
    /// No line matched; the first line is taken as the header
    Fallback(usize),
    /// The text has no non-blank lines
    Empty,
}

impl HeaderPosition {
    pub fn line_number(&self) -> Option<usize> {
        match self {
            HeaderPosition::Matched(n) | HeaderPosition::Fallback(n) => Some(*n),
            HeaderPosition::Empty => None,
        }
    }
}

/// Finds the header row: the first line containing all `words`
/// (case-insensitive), else the first line of the text.
pub fn locate_header(source: &str, words: &[&str]) -> HeaderPosition {
    let mut cursor = LineCursor::new(source);
    let first = match cursor.peek() {
        Some(line) => line.line_number,
        None => return HeaderPosition::Empty,
    };
    while let Some(line) = cursor.next() {
        if contains_all_words(line.content, words) {
            return HeaderPosition::Matched(line.line_number);
        }
    }
    HeaderPosition::Fallback(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &[&str] = &["type", "category", "title"];

    #[test]
    fn test_cursor_skips_blank_lines() {
        let mut cursor = LineCursor::new("a\n\n  \nb\n");
        assert_eq!(cursor.len(), 2);
        assert_eq!(cursor.next().map(|l| l.line_number), Some(1));
        assert_eq!(cursor.next().map(|l| l.content), Some("b"));
        assert!(cursor.at_end());
    }

    #[test]
    fn test_locate_header_after_preamble() {
        let text = "Here is the table:\n\nTYPE | Category | Title\nbug | x | y";
        assert_eq!(locate_header(text, WORDS), HeaderPosition::Matched(3));
    }

    #[test]
    fn test_locate_header_fallback() {
        let text = "\nfirst line\nbug | x | y";
        assert_eq!(locate_header(text, WORDS), HeaderPosition::Fallback(2));
        assert_eq!(locate_header("  \n", WORDS), HeaderPosition::Empty);
    }
}
