//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::{get, list, set};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "kvf")]
#[command(author, version, about = "Get and set values in key=value files, safely across processes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the config file setting, then text)
    #[arg(long, short = 'f', global = true, env = "KVF_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory for lock files
    #[arg(long, global = true, env = "KVF_LOCK_DIR")]
    pub lock_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get a value from one or more files (later files override earlier ones)
    Get(get::GetArgs),

    /// Set a value in one or more files
    Set(set::SetArgs),

    /// List every entry of a file
    List(list::ListArgs),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format, cli.verbose);
    let lock = config.file_lock(cli.lock_dir.as_deref());

    output.verbose_ctx("lock", &format!("Lock directory: {}", lock.lock_dir().display()));

    match cli.command {
        Commands::Get(args) => get::run(args, &lock, &output)?,
        Commands::Set(args) => set::run(args, &lock, &output)?,
        Commands::List(args) => list::run(args, &lock, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Sends library diagnostics to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "kvf=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Splits trailing positional arguments off a `FILE... <ARGS>` list
pub(super) fn split_files(mut args: Vec<String>, trailing: usize) -> (Vec<PathBuf>, Vec<String>) {
    let at = args.len().saturating_sub(trailing);
    let rest = args.split_off(at);
    (args.into_iter().map(PathBuf::from).collect(), rest)
}
