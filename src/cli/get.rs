//! `kvf get`

use anyhow::{Context, Result};
use clap::Args;

use super::app::split_files;
use super::output::Output;
use crate::storage::{lookup, FileLock, LookupOptions, StoreError};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// One or more files followed by the key. Put `--` before the files
    /// when the key starts with '-'.
    #[arg(
        required = true,
        num_args = 2..,
        allow_negative_numbers = true,
        value_name = "FILE... KEY"
    )]
    pub args: Vec<String>,

    /// Printed when the key is not found in any file
    #[arg(long, short = 'd')]
    pub default: Option<String>,

    /// Treat missing or unreadable files as empty instead of failing.
    /// Meant for multiple files or together with --default.
    #[arg(long, short = 'm')]
    pub skip_missing_files: bool,
}

pub fn run(args: GetArgs, lock: &FileLock, output: &Output) -> Result<()> {
    let (files, rest) = split_files(args.args, 1);
    let key = rest.concat();

    output.verbose_ctx("get", &format!("Looking up '{}' in {} file(s)", key, files.len()));

    let options = LookupOptions {
        skip_missing: args.skip_missing_files,
    };
    let found = lookup(files.as_slice(), &key, options, lock)
        .with_context(|| format!("Failed to read '{}'", key))?;

    match (found, args.default) {
        (Some(item), _) => output.value(&item.key, &item.value, false),
        (None, Some(default)) => {
            output.verbose_ctx("get", "Key not found, using default");
            output.value(&key, &default, true)
        }
        (None, None) => return Err(StoreError::NotFound(key).into()),
    }

    Ok(())
}
