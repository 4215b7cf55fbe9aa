//! Domain models for kvf
//!
//! Contains the file format and record handling without any I/O concerns.

mod item;
mod line;
mod collection;

pub use item::{Item, ItemError};
pub use line::{parse_line, Entry, FormatError, Quote, Record};
pub use collection::{RecordCollection, Upsert};
