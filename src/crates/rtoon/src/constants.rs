//! Constants used throughout the TOON library

// Structural characters
pub const PIPE: char = '|';
pub const COMMA: char = ',';
pub const SPACE: char = ' ';

/// Separator written between fields of a row.
pub const FIELD_SEPARATOR: &str = " | ";

/// Marker a producer writes in place of a literal pipe inside a field.
pub const PIPE_ESCAPE: &str = "[PIPE]";

// Characters removed from free text fields
pub const BACKSLASH: char = '\\';
pub const DOUBLE_QUOTE: char = '"';
pub const NEWLINE: char = '\n';
pub const CARRIAGE_RETURN: char = '\r';

// List brackets
pub const OPEN_BRACKET: char = '[';
pub const CLOSE_BRACKET: char = ']';
