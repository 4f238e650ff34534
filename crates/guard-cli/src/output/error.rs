//! CLI error types and handling.

use std::process::ExitCode;

use colored::Colorize;
use guard_anonymize::AnonymizeError;

/// CLI error type.
#[derive(Debug)]
pub struct CliError {
    /// Error kind.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// Underlying cause.
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration error.
    Config,
    /// Invalid input.
    Validation,
    /// IO error.
    Io,
    /// Output/formatting error.
    Output,
    /// Pipeline failure.
    Internal,
}

impl CliError {
    /// Creates a new CLI error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a new CLI error with a cause.
    pub fn with_cause<E>(kind: ErrorKind, message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates an IO error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self.kind {
            ErrorKind::Config => ExitCode::from(2),
            ErrorKind::Validation => ExitCode::from(4),
            ErrorKind::Io => ExitCode::from(5),
            ErrorKind::Output => ExitCode::from(6),
            ErrorKind::Internal => ExitCode::from(1),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<AnonymizeError> for CliError {
    fn from(error: AnonymizeError) -> Self {
        let kind = match &error {
            AnonymizeError::InvalidConfig(_) | AnonymizeError::ConfigLoad(_) => ErrorKind::Config,
            _ => ErrorKind::Internal,
        };
        Self::with_cause(kind, format!("[{}]", error.code()), error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_cause(ErrorKind::Output, "JSON error", error)
    }
}

/// Prints an error to stderr.
pub fn print_error(error: &CliError) {
    let prefix = match error.kind {
        ErrorKind::Config => "Configuration error",
        ErrorKind::Validation => "Validation error",
        ErrorKind::Io => "IO error",
        ErrorKind::Output => "Output error",
        ErrorKind::Internal => "Pipeline error",
    };

    eprintln!("{} {}", format!("{prefix}:").red().bold(), error.message);

    if let Some(ref cause) = error.cause {
        eprintln!("  {}", format!("Caused by: {cause}").dimmed());
    }

    if error.kind == ErrorKind::Config {
        eprintln!();
        eprintln!("{}", "Hint: check the TOML file passed with --config, e.g.".dimmed());
        eprintln!("{}", "  threshold = 50".dimmed());
        eprintln!("{}", "  [sampler]".dimmed());
        eprintln!("{}", "  seed = 42".dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymize_error_kinds() {
        let err = CliError::from(AnonymizeError::InvalidConfig("bad".into()));
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.to_string().contains("ANON_INVALID_CONFIG"));

        let err = CliError::from(AnonymizeError::UnknownFeature("x".into()));
        assert_eq!(err.kind, ErrorKind::Internal);
    }
}
