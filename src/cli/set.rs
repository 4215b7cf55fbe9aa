//! `kvf set`

use anyhow::{Context, Result};
use clap::Args;

use super::app::split_files;
use super::output::Output;
use crate::domain::Item;
use crate::storage::{set_all, FileLock};

#[derive(Args, Debug)]
pub struct SetArgs {
    /// One or more files followed by the key and the value
    #[arg(required = true, num_args = 3.., allow_hyphen_values = true, value_name = "FILE... KEY VALUE")]
    pub args: Vec<String>,
}

pub fn run(args: SetArgs, lock: &FileLock, output: &Output) -> Result<()> {
    let (files, mut rest) = split_files(args.args, 2);
    let value = rest.pop().unwrap_or_default();
    let key = rest.pop().unwrap_or_default();
    let item = Item::new(key, value);

    output.verbose_ctx("set", &format!("Setting '{}' in {} file(s)", item.key, files.len()));

    set_all(files.as_slice(), &item, lock).with_context(|| format!("Failed to set '{}'", item.key))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "key": item.key,
            "value": item.value,
            "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
        }));
    }

    Ok(())
}
