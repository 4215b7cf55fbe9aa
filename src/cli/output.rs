//! Output formatting for CLI commands

use serde::Serialize;

use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a looked-up value.
    ///
    /// Text mode prints the bare value with no trailing newline, so it can
    /// be captured by a shell as is.
    pub fn value(&self, key: &str, value: &str, is_default: bool) {
        match self.format {
            OutputFormat::Text => print!("{}", value),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "key": key,
                        "value": value,
                        "default": is_default,
                    })
                );
            }
        }
    }

    /// Prints structured data as one line of JSON. Callers render text
    /// mode themselves.
    pub fn data<T: Serialize>(&self, data: &T) {
        if let Ok(json) = serde_json::to_string(data) {
            println!("{}", json);
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}
