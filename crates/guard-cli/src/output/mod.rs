//! Output formatting and display utilities.

mod error;
mod format;
mod report;

pub use error::{print_error, CliError, ErrorKind};
pub use format::OutputFormat;
pub use report::{print_analysis, print_placeholders, print_stages};

use colored::Colorize;
use guard_anonymize::{MaskingResult, MaskingStats, PipelineTrace};
use serde::Serialize;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prints a warning message.
pub fn warn(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Machine-readable run report.
#[derive(Serialize)]
struct MaskReport<'a> {
    #[serde(flatten)]
    result: &'a MaskingResult,
    stats: MaskingStats,
}

/// Prints a pipeline run in the selected format.
pub fn print_trace(trace: &PipelineTrace, format: OutputFormat, verbose: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => {
            if verbose {
                print_stages(trace);
            }
            print_analysis(trace);
            Ok(())
        }
        OutputFormat::Json | OutputFormat::JsonCompact => {
            let report = MaskReport {
                result: &trace.result,
                stats: trace.stats(),
            };
            let json = if format == OutputFormat::Json {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{json}");
            Ok(())
        }
        OutputFormat::Plain => {
            println!("{}", trace.result.masked_text);
            Ok(())
        }
    }
}
