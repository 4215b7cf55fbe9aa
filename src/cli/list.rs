//! `kvf list`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::output::Output;
use crate::storage::{FileLock, FileRepo, MissingFile};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// File to list
    pub file: PathBuf,

    /// Create the file empty if it does not exist
    #[arg(long)]
    pub create: bool,
}

pub fn run(args: ListArgs, lock: &FileLock, output: &Output) -> Result<()> {
    let missing = if args.create {
        MissingFile::Create
    } else {
        MissingFile::Error
    };
    let repo = FileRepo::with_lock(&args.file, missing, lock.clone());

    let items = repo
        .find_all()
        .with_context(|| format!("Failed to list {}", args.file.display()))?;
    output.verbose_ctx("list", &format!("Found {} entries", items.len()));

    if output.is_json() {
        output.data(&items);
    } else {
        for item in &items {
            println!("{}", item);
        }
    }

    Ok(())
}
