//! TOON decoding

pub mod merge;
pub mod parser;
pub mod scanner;

pub use merge::merge_tables;
pub use parser::{parse_list_field, parse_table, split_fields};
pub use scanner::{locate_header, HeaderPosition, LineCursor};
