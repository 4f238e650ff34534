//! Output format options.

use clap::ValueEnum;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report with an audit table.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
    /// Compact JSON (single line).
    #[value(name = "json-compact")]
    JsonCompact,
    /// Masked text only (for scripting).
    Plain,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::JsonCompact => write!(f, "json-compact"),
            Self::Plain => write!(f, "plain"),
        }
    }
}
