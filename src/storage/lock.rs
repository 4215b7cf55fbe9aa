//! Cross-process advisory lock per data file
//!
//! The lock is not taken on the data file itself but on a sidecar file in
//! the lock directory, named after a hash of the data file's absolute path.
//! That lets an update lock a path before the file exists, and keeps lock
//! files out of the user's directories.
//!
//! Each acquisition opens its own handle, so two threads of one process
//! exclude each other the same way two processes do.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Lock directories are shared by every user of a data file
#[cfg(unix)]
const SHARED_DIR_MODE: u32 = 0o1777;

/// Symlink hops followed before giving up on resolving a path
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to create lock directory {path}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to open lock file {path}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to acquire lock for {path}")]
    Acquire { path: PathBuf, source: io::Error },

    #[error("Failed to release lock for {path}")]
    Release { path: PathBuf, source: io::Error },
}

/// Where lock files for data paths live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLock {
    lock_dir: PathBuf,
}

impl FileLock {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Lock file used for a data path
    pub fn lock_path_for(&self, data_path: &Path) -> PathBuf {
        let identity = absolute_identity(data_path);
        let hash = blake3::hash(identity.to_string_lossy().as_bytes());
        let hex = hash.to_hex();
        self.lock_dir.join(format!("{}.lock", &hex[..16]))
    }

    /// Acquires the exclusive lock for a data path. Blocks until available.
    pub fn acquire(&self, data_path: &Path) -> Result<LockHandle, LockError> {
        self.ensure_lock_dir()?;

        let lock_path = self.lock_path_for(data_path);
        let file = open_lock_file(&lock_path).map_err(|source| LockError::Open {
            path: lock_path.clone(),
            source,
        })?;

        tracing::trace!(data = %data_path.display(), lock = %lock_path.display(), "waiting for lock");
        file.lock_exclusive().map_err(|source| LockError::Acquire {
            path: data_path.to_path_buf(),
            source,
        })?;
        tracing::debug!(data = %data_path.display(), "lock acquired");

        Ok(LockHandle {
            file: Some(file),
            data_path: data_path.to_path_buf(),
        })
    }

    /// Creates the lock directory writable for everyone, sticky like `/tmp`
    fn ensure_lock_dir(&self) -> Result<(), LockError> {
        if self.lock_dir.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(&self.lock_dir).map_err(|source| LockError::CreateDir {
            path: self.lock_dir.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let shared = fs::Permissions::from_mode(SHARED_DIR_MODE);
            if let Err(e) = fs::set_permissions(&self.lock_dir, shared) {
                // Another user created it first
                tracing::debug!(dir = %self.lock_dir.display(), "lock dir left as is: {}", e);
            }
        }
        Ok(())
    }
}

/// Opens an existing lock file read-only, creating it only when missing.
/// A shared lock file owned by another user stays usable.
fn open_lock_file(lock_path: &Path) -> io::Result<File> {
    match File::open(lock_path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path),
        result => result,
    }
}

/// An exclusively held lock.
///
/// [`release`](LockHandle::release) consumes the handle, so a lock cannot be
/// released twice. A handle dropped without release (early return, panic)
/// unlocks on drop.
#[derive(Debug)]
pub struct LockHandle {
    file: Option<File>,
    data_path: PathBuf,
}

impl LockHandle {
    /// Releases the lock, reporting failure
    pub fn release(mut self) -> Result<(), LockError> {
        match self.file.take() {
            Some(file) => self.unlock(&file),
            None => Ok(()),
        }
    }

    fn unlock(&self, file: &File) -> Result<(), LockError> {
        file.unlock().map_err(|source| LockError::Release {
            path: self.data_path.clone(),
            source,
        })?;
        tracing::debug!(data = %self.data_path.display(), "lock released");
        Ok(())
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            // Closing the handle releases the lock as well
            if let Err(e) = self.unlock(&file) {
                tracing::warn!("{}", e);
            }
        }
    }
}

/// Absolute path of the file a path names, with the parent directory
/// canonicalized and a symlinked leaf followed even when its target does
/// not exist yet. The result is the same before and after the file is
/// created.
fn absolute_identity(path: &Path) -> PathBuf {
    let mut current = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    for _ in 0..MAX_LINK_HOPS {
        let resolved = match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|parent| parent.join(name))
                .unwrap_or_else(|_| current.clone()),
            _ => return current,
        };

        match fs::read_link(&resolved) {
            Ok(target) => {
                current = match resolved.parent() {
                    Some(parent) => parent.join(target),
                    None => target,
                };
            }
            Err(_) => return resolved,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn same_path_same_lock_file() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("locks"));

        let data = dir.path().join("data.env");
        let before = lock.lock_path_for(&data);
        fs::write(&data, "").unwrap();
        let after = lock.lock_path_for(&data);
        let dotted = lock.lock_path_for(&dir.path().join(".").join("data.env"));

        assert_eq!(before, after);
        assert_eq!(before, dotted);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_keeps_its_lock_file() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("locks"));
        let target = dir.path().join("target.env");
        let link = dir.path().join("link.env");
        std::os::unix::fs::symlink("target.env", &link).unwrap();

        let before = lock.lock_path_for(&link);
        fs::write(&target, "k=v\n").unwrap();
        let after = lock.lock_path_for(&link);

        assert_eq!(before, after);
        assert_eq!(before, lock.lock_path_for(&target));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_chain_resolves_to_target() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("locks"));
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        std::os::unix::fs::symlink("../target.env", sub.join("hop.env")).unwrap();
        std::os::unix::fs::symlink(sub.join("hop.env"), dir.path().join("link.env")).unwrap();

        assert_eq!(
            lock.lock_path_for(&dir.path().join("link.env")),
            lock.lock_path_for(&dir.path().join("target.env"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn created_lock_dir_is_shared() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("locks"));
        lock.acquire(&dir.path().join("data")).unwrap().release().unwrap();

        let mode = fs::metadata(lock.lock_dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, SHARED_DIR_MODE);
    }

    #[test]
    fn read_only_lock_file_still_locks() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("locks"));
        let data = dir.path().join("data");

        lock.acquire(&data).unwrap().release().unwrap();
        let lock_path = lock.lock_path_for(&data);
        let mut perms = fs::metadata(&lock_path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&lock_path, perms).unwrap();

        let handle = lock.acquire(&data).unwrap();
        handle.release().unwrap();
    }

    #[test]
    fn lock_errors_do_not_repeat_their_cause() {
        let err = LockError::Open {
            path: PathBuf::from("/locks/x.lock"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.to_string(), "Failed to open lock file /locks/x.lock");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn different_paths_different_lock_files() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path());

        assert_ne!(
            lock.lock_path_for(&dir.path().join("a")),
            lock.lock_path_for(&dir.path().join("b"))
        );
    }

    #[test]
    fn acquire_creates_lock_dir() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("nested").join("locks"));

        let handle = lock.acquire(&dir.path().join("data")).unwrap();
        assert!(lock.lock_dir().is_dir());
        handle.release().unwrap();
    }

    #[test]
    fn lock_excludes_other_threads() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path().join("locks"));
        let data = dir.path().join("data");

        let handle = lock.acquire(&data).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let lock = lock.clone();
            let data = data.clone();
            thread::spawn(move || {
                let handle = lock.acquire(&data).unwrap();
                tx.send(()).unwrap();
                handle.release().unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        handle.release().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(10)).is_ok());
        waiter.join().unwrap();
    }

    #[test]
    fn drop_releases_lock() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path());
        let data = dir.path().join("data");

        {
            let _handle = lock.acquire(&data).unwrap();
        }

        let (tx, rx) = mpsc::channel();
        let lock2 = lock.clone();
        thread::spawn(move || {
            let handle = lock2.acquire(&data).unwrap();
            tx.send(()).unwrap();
            drop(handle);
        });
        assert!(rx.recv_timeout(Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn other_paths_are_not_blocked() {
        let dir = TempDir::new().unwrap();
        let lock = FileLock::new(dir.path());

        let a = lock.acquire(&dir.path().join("a")).unwrap();
        let b = lock.acquire(&dir.path().join("b")).unwrap();
        b.release().unwrap();
        a.release().unwrap();
    }
}
