//! Error type shared by the adapter and repository

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::lock::LockError;
use crate::domain::{FormatError, ItemError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ItemError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Failed to access {path}")]
    Io { path: PathBuf, source: io::Error },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True for the open failures that tolerant reads skip
    pub fn is_missing_file(&self) -> bool {
        match self {
            StoreError::Io { source, .. } => is_missing_or_denied(source),
            _ => false,
        }
    }
}

pub(crate) fn is_missing_or_denied(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}
