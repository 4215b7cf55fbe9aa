//! kvf - concurrent-safe access to `key=value` files
//!
//! Several processes can read and update the same file at once. Every
//! operation re-reads the file under a cross-process lock, and updates
//! rewrite it in place without disturbing comments, blank lines, or the
//! formatting of untouched entries.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Item, Record, RecordCollection};
pub use storage::{FileRepo, MissingFile, StoreError};
