//! Key/value repository
//!
//! Every call reads the whole file under the lock into a fresh
//! [`RecordCollection`] and discards it afterwards; nothing is cached
//! between calls.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{Item, RecordCollection, Upsert};

use super::adapter::{FileAdapter, MissingFile, UpdateCycle};
use super::error::StoreError;
use super::lock::FileLock;

/// Repository over a single key/value file
pub struct FileRepo {
    adapter: FileAdapter,
}

impl FileRepo {
    /// Opens a repository using the default lock directory
    pub fn new(path: impl Into<PathBuf>, missing: MissingFile) -> Self {
        Self::with_lock(path, missing, FileLock::default())
    }

    pub fn with_lock(path: impl Into<PathBuf>, missing: MissingFile, lock: FileLock) -> Self {
        Self {
            adapter: FileAdapter::new(path, missing, lock),
        }
    }

    pub fn path(&self) -> &Path {
        self.adapter.path()
    }

    /// Returns the first entry with this key
    pub fn get(&self, key: &str) -> Result<Item, StoreError> {
        Item::validate_key(key)?;

        let collection = self.load()?;
        collection
            .get(key)
            .map(|entry| entry.to_item())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Replaces the item's value in place, or appends it at the end
    pub fn set(&self, item: &Item) -> Result<(), StoreError> {
        item.validate_writable()?;

        let mut cycle = SetCycle {
            path: self.path(),
            collection: RecordCollection::new(),
            incoming: item,
        };
        self.adapter.ensure_update(&mut cycle)
    }

    /// All entries in file order. Comments and blank lines are skipped.
    pub fn find_all(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.load()?.items())
    }

    fn load(&self) -> Result<RecordCollection, StoreError> {
        let mut collection = RecordCollection::new();
        self.adapter
            .read_by_line(|line| Ok(collection.push_line(line)?))?;
        Ok(collection)
    }
}

struct SetCycle<'a> {
    path: &'a Path,
    collection: RecordCollection,
    incoming: &'a Item,
}

impl UpdateCycle for SetCycle<'_> {
    fn read_line(&mut self, line: &str) -> Result<(), StoreError> {
        Ok(self.collection.push_line(line)?)
    }

    fn update(&mut self) -> Result<(), StoreError> {
        match self.collection.upsert(self.incoming) {
            Upsert::Replaced(i) => tracing::debug!(key = %self.incoming.key, line = i + 1, "replaced entry"),
            Upsert::Appended(i) => tracing::debug!(key = %self.incoming.key, line = i + 1, "appended entry"),
        }
        Ok(())
    }

    fn write(&mut self, out: &mut dyn Write) -> Result<u64, StoreError> {
        self.collection
            .write_to(out)
            .map_err(|e| StoreError::io(self.path, e))
    }
}

/// Options for [`lookup`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupOptions {
    /// Treat missing or unreadable files as empty
    pub skip_missing: bool,
}

/// Looks a key up in several files, in order. A later file overrides an
/// earlier one. Returns `None` when no file has the key.
pub fn lookup<P: AsRef<Path>>(
    paths: &[P],
    key: &str,
    options: LookupOptions,
    lock: &FileLock,
) -> Result<Option<Item>, StoreError> {
    Item::validate_key(key)?;

    let missing = if options.skip_missing {
        MissingFile::Skip
    } else {
        MissingFile::Error
    };

    let mut found = None;
    for path in paths {
        let repo = FileRepo::with_lock(path.as_ref(), missing, lock.clone());
        match repo.get(key) {
            Ok(item) => found = Some(item),
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(found)
}

/// Sets the item in each file in turn, stopping at the first failure
pub fn set_all<P: AsRef<Path>>(paths: &[P], item: &Item, lock: &FileLock) -> Result<(), StoreError> {
    for path in paths {
        FileRepo::with_lock(path.as_ref(), MissingFile::Error, lock.clone()).set(item)?;
    }
    Ok(())
}
