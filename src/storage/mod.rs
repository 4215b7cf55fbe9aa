//! # Storage Layer
//!
//! Locked, crash-safe access to line-oriented `key=value` files.
//!
//! ## Update Protocol
//!
//! Every write is one read-modify-write cycle under an exclusive lock:
//!
//! ```text
//! Idle -> LockAcquired -> Read -> Mutated -> Written -> Truncated -> LockReleased
//! ```
//!
//! Any failure jumps straight to `LockReleased`. The file is rewritten in
//! place and truncated to the new length, so a shrinking file leaves no
//! stale tail.
//!
//! ## Concurrency Safety
//!
//! - [`FileLock`] uses `fs2` advisory locks on a per-path lock file
//! - Reads take the same lock, so they never see a half-written file
//! - Different paths use different locks and never wait on each other
//!
//! ## Key Types
//!
//! - [`FileRepo`] - `get`, `set` and `find_all` on one file
//! - [`FileAdapter`] - locked line reads and update cycles
//! - [`FileLock`] / [`LockHandle`] - the cross-process lock
//! - [`Config`] - global configuration

mod error;
mod lock;
mod adapter;
mod repo;
mod config;

pub use error::StoreError;
pub use lock::{FileLock, LockError, LockHandle};
pub use adapter::{FileAdapter, MissingFile, UpdateCycle};
pub use repo::{lookup, set_all, FileRepo, LookupOptions};
pub use config::{default_lock_dir, Config, ConfigError, GlobalConfig, OutputFormat};
