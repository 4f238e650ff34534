//! Text masking command.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use guard_anonymize::{PipelineConfig, ProcessOptions};

use crate::output::{self, CliError};

use super::{announce_annotator, build_pipeline, Context};

/// Mask high-risk entities in text.
#[derive(Args)]
pub struct MaskCommand {
    /// Text to mask
    #[arg(long, short, conflicts_with = "file")]
    pub text: Option<String>,

    /// Read from file
    #[arg(long, short = 'i', conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Read from stdin
    #[arg(long, conflicts_with_all = ["text", "file"])]
    pub stdin: bool,

    /// Minimum risk weight to mask (above 100 masks nothing)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Skip contextual risk adjustment
    #[arg(long)]
    pub no_context: bool,
}

impl MaskCommand {
    /// Runs the mask command.
    pub fn run(self, config: PipelineConfig, ctx: &Context) -> Result<(), CliError> {
        let input = Self::get_text(self.text, self.file, self.stdin)?;
        let input = input.trim_end_matches(['\r', '\n']);

        let mut options = ProcessOptions::new();
        if let Some(threshold) = self.threshold {
            options = options.with_threshold(threshold);
        }
        if self.no_context {
            options = options.with_contextual_analysis(false);
        }

        let pipeline = build_pipeline(config)?;
        announce_annotator(&pipeline, ctx);

        let trace = pipeline.process_traced(input, &options)?;
        output::print_trace(&trace, ctx.format(), ctx.verbose)
    }

    fn get_text(
        text: Option<String>,
        file: Option<PathBuf>,
        stdin: bool,
    ) -> Result<String, CliError> {
        if let Some(t) = text {
            Ok(t)
        } else if let Some(path) = file {
            std::fs::read_to_string(&path)
                .map_err(|e| CliError::io(format!("Failed to read {}: {e}", path.display())))
        } else if stdin {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CliError::io(format!("Failed to read stdin: {e}")))?;
            Ok(buffer)
        } else {
            Err(CliError::validation(
                "Provide input with --text, --file, or --stdin",
            ))
        }
    }
}
