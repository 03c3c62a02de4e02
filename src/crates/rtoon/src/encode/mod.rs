//! TOON encoding

pub mod writer;

pub use writer::TableWriter;
