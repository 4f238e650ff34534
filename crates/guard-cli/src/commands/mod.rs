//! CLI command definitions and implementations.

mod demo;
mod mask;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use guard_anonymize::{DeidentificationPipeline, PipelineConfig};

use crate::output::{self, CliError, OutputFormat};

pub use demo::DemoCommand;
pub use mask::MaskCommand;

/// Privacy Guard CLI
///
/// Masks identifying entities in Korean clinical text by re-identification risk.
#[derive(Parser)]
#[command(name = "guard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(long, short, env = "GUARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show per-stage weights and debug logs
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Print only the masked text
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Mask high-risk entities in text
    Mask(MaskCommand),

    /// Run the pipeline over built-in sample sentences
    Demo(DemoCommand),

    /// List entity type placeholders
    Placeholders,
}

/// Settings shared by every command.
pub struct Context {
    /// Output format.
    pub format: OutputFormat,
    /// Show per-stage weights.
    pub verbose: bool,
    /// Print only the masked text.
    pub quiet: bool,
}

impl Context {
    /// Returns the effective format; quiet forces plain output.
    pub fn format(&self) -> OutputFormat {
        if self.quiet {
            OutputFormat::Plain
        } else {
            self.format
        }
    }
}

impl Cli {
    /// Runs the selected command.
    pub fn run(self) -> Result<(), CliError> {
        let ctx = Context {
            format: self.format,
            verbose: self.verbose,
            quiet: self.quiet,
        };
        let config = load_config(self.config.as_ref())?;

        match self.command {
            Commands::Mask(cmd) => cmd.run(config, &ctx),
            Commands::Demo(cmd) => cmd.run(config, &ctx),
            Commands::Placeholders => {
                let pipeline = build_pipeline(config)?;
                output::print_placeholders(pipeline.placeholders());
                Ok(())
            }
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => {
            let config = PipelineConfig::load(path)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Builds the pipeline with the rule-based annotator.
pub(crate) fn build_pipeline(config: PipelineConfig) -> Result<DeidentificationPipeline, CliError> {
    Ok(DeidentificationPipeline::new(config)?)
}

/// Warns that labels come from heuristics when output is human-readable.
pub(crate) fn announce_annotator(pipeline: &DeidentificationPipeline, ctx: &Context) {
    if ctx.format() == OutputFormat::Table && pipeline.model_source().is_degraded() {
        output::warn("No token classifier configured; using rule-based annotation");
    }
}
