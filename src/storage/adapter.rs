//! Locked file access
//!
//! All reads and writes of a data file go through a [`FileAdapter`], which
//! holds the path's lock for the whole operation. An update is one cycle:
//!
//! ```text
//! lock -> open (create) -> read lines -> update -> seek 0 -> write -> truncate -> unlock
//! ```
//!
//! A failure at any step skips the rest. The lock and file handle are
//! released on every exit path.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{is_missing_or_denied, StoreError};
use super::lock::FileLock;

/// What a read does when the data file cannot be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFile {
    /// Propagate the open error
    #[default]
    Error,
    /// Treat a missing or unreadable file as empty
    Skip,
    /// Create the file empty
    Create,
}

/// The three phases of an update, run under one lock
pub trait UpdateCycle {
    /// Called once per existing line, in file order
    fn read_line(&mut self, line: &str) -> Result<(), StoreError>;

    /// Called once after all lines were read
    fn update(&mut self) -> Result<(), StoreError>;

    /// Writes the full new content and returns the number of bytes written
    fn write(&mut self, out: &mut dyn Write) -> Result<u64, StoreError>;
}

pub struct FileAdapter {
    path: PathBuf,
    missing: MissingFile,
    lock: FileLock,
}

impl FileAdapter {
    pub fn new(path: impl Into<PathBuf>, missing: MissingFile, lock: FileLock) -> Self {
        Self {
            path: path.into(),
            missing,
            lock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Calls `on_line` for every line under the lock.
    ///
    /// A missing file is an error, or zero lines under [`MissingFile::Skip`].
    /// [`MissingFile::Create`] behaves like [`ensure_read_by_line`](Self::ensure_read_by_line).
    pub fn read_by_line<F>(&self, on_line: F) -> Result<(), StoreError>
    where
        F: FnMut(&str) -> Result<(), StoreError>,
    {
        if self.missing == MissingFile::Create {
            return self.ensure_read_by_line(on_line);
        }

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if self.missing == MissingFile::Skip && is_missing_or_denied(&e) => {
                tracing::debug!(path = %self.path.display(), "skipping inaccessible file: {}", e);
                return Ok(());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        self.locked_read(&file, on_line)
    }

    /// Like [`read_by_line`](Self::read_by_line), but creates the file
    /// empty when it does not exist. An existing file only needs read
    /// access.
    pub fn ensure_read_by_line<F>(&self, on_line: F) -> Result<(), StoreError>
    where
        F: FnMut(&str) -> Result<(), StoreError>,
    {
        let file = match File::open(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.path),
            result => result,
        }
        .map_err(|e| StoreError::io(&self.path, e))?;

        self.locked_read(&file, on_line)
    }

    /// Runs one read-update-write cycle atomically with respect to every
    /// other adapter on the same path.
    pub fn ensure_update(&self, cycle: &mut dyn UpdateCycle) -> Result<(), StoreError> {
        let handle = self.lock.acquire(&self.path)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        read_lines(&self.path, &file, |line| cycle.read_line(line))?;
        cycle.update()?;

        file.seek(SeekFrom::Start(0))
            .map_err(|e| StoreError::io(&self.path, e))?;

        let written = {
            let mut writer = BufWriter::new(&file);
            let written = cycle.write(&mut writer)?;
            writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
            written
        };

        file.set_len(written)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.sync_all()
            .map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), bytes = written, "file rewritten");

        drop(file);
        handle.release()?;
        Ok(())
    }

    fn locked_read<F>(&self, file: &File, on_line: F) -> Result<(), StoreError>
    where
        F: FnMut(&str) -> Result<(), StoreError>,
    {
        let handle = self.lock.acquire(&self.path)?;
        read_lines(&self.path, file, on_line)?;
        handle.release()?;
        Ok(())
    }
}

/// Streams lines without terminators; a trailing `\r` is dropped
fn read_lines<F>(path: &Path, file: &File, mut on_line: F) -> Result<(), StoreError>
where
    F: FnMut(&str) -> Result<(), StoreError>,
{
    let reader = BufReader::new(file);
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StoreError::io(path, e))?;
        tracing::trace!(path = %path.display(), line = number + 1, bytes = line.len(), "read line");
        on_line(&line)?;
    }
    Ok(())
}
