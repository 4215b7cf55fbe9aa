//! Concurrent writers on one file
//!
//! Distinct keys written at the same time must all survive, each exactly
//! once, whether the writers are threads or separate processes.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use kvf::storage::{FileLock, FileRepo, MissingFile};
use kvf::Item;
use tempfile::TempDir;

fn assert_each_key_once(path: &Path, count: usize) {
    let content = fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), count);
    for i in 0..count {
        let line = format!("key{}=value{}", i, i);
        assert_eq!(
            content.lines().filter(|l| *l == line).count(),
            1,
            "expected exactly one '{}'",
            line
        );
    }
}

#[test]
fn concurrent_threads_keep_every_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.env");
    let lock = FileLock::new(dir.path().join("locks"));
    let count = 64;

    let path = Arc::new(path);
    let handles: Vec<_> = (0..count)
        .map(|i| {
            let path = Arc::clone(&path);
            let lock = lock.clone();
            thread::spawn(move || {
                let repo = FileRepo::with_lock(path.as_path(), MissingFile::Error, lock);
                repo.set(&Item::new(format!("key{}", i), format!("value{}", i)))
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_each_key_once(&path, count);
}

#[test]
fn concurrent_readers_never_see_partial_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.env");
    let lock = FileLock::new(dir.path().join("locks"));
    fs::write(&path, "# header\nstable=yes\n").unwrap();

    let writer = {
        let path = path.clone();
        let lock = lock.clone();
        thread::spawn(move || {
            let repo = FileRepo::with_lock(&path, MissingFile::Error, lock);
            for i in 0..50 {
                let value = if i % 2 == 0 { "a much longer value here" } else { "s" };
                repo.set(&Item::new("churn", value)).unwrap();
            }
        })
    };

    let repo = FileRepo::with_lock(&path, MissingFile::Error, lock);
    for _ in 0..50 {
        let items = repo.find_all().unwrap();
        assert_eq!(items[0], Item::new("stable", "yes"));
    }

    writer.join().unwrap();
}

#[test]
fn concurrent_processes_keep_every_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.env");
    let count = 16;

    let children: Vec<_> = (0..count)
        .map(|i| {
            std::process::Command::new(assert_cmd::cargo::cargo_bin!("kvf"))
                .env("KVF_LOCK_DIR", dir.path().join("locks"))
                .arg("set")
                .arg(&path)
                .arg(format!("key{}", i))
                .arg(format!("value{}", i))
                .spawn()
                .unwrap()
        })
        .collect();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    assert_each_key_once(&path, count);
}
