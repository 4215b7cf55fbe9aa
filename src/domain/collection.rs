//! Ordered in-memory view of one key/value file
//!
//! Records are addressed by position, in file line order. Lookups are a
//! linear scan: files are small and re-read on every operation, so there
//! is no index to keep in sync.

use std::io::{self, Write};

use super::item::Item;
use super::line::{parse_line, Entry, FormatError, Record};

/// Outcome of [`RecordCollection::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// An existing entry at this position was overwritten
    Replaced(usize),
    /// A new entry was appended at this position
    Appended(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCollection {
    records: Vec<Record>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a line and appends the resulting record
    pub fn push_line(&mut self, line: &str) -> Result<(), FormatError> {
        self.records.push(parse_line(line)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of the first entry with this key. Blank and comment
    /// records never match.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.entry().is_some_and(|e| e.key() == key))
    }

    /// First entry with this key
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.position(key).and_then(|i| self.records[i].entry())
    }

    /// Replaces the value of the first entry with the item's key, or
    /// appends a new entry at the end.
    pub fn upsert(&mut self, item: &Item) -> Upsert {
        match self.position(&item.key) {
            Some(i) => {
                if let Some(entry) = self.records[i].entry_mut() {
                    entry.set_value(item.value.clone());
                }
                Upsert::Replaced(i)
            }
            None => {
                self.records
                    .push(Entry::new(item.key.clone(), item.value.clone()).into());
                Upsert::Appended(self.records.len() - 1)
            }
        }
    }

    /// All data entries as items, in file order
    pub fn items(&self) -> Vec<Item> {
        self.records
            .iter()
            .filter_map(Record::entry)
            .map(Entry::to_item)
            .collect()
    }

    /// Serializes every record and returns the number of bytes written
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<u64> {
        let mut written = 0u64;
        for record in &self.records {
            let line = record.to_line();
            writer.write_all(line.as_bytes())?;
            written += line.len() as u64;
        }
        Ok(written)
    }
}
