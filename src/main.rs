//! kvf - get and set values in key=value files

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = kvf::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
