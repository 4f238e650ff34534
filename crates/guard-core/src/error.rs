//! Error types for Privacy Guard core records.

use thiserror::Error;

/// Result type alias using `GuardError`.
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors raised while constructing core records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// A risk weight outside the 0-100 scale.
    #[error("risk weight out of range: {0} (expected 0-100)")]
    WeightOutOfRange(u16),

    /// An annotation with an empty token.
    #[error("entity annotation has an empty token")]
    EmptyToken,
}

impl GuardError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::WeightOutOfRange(_) => "GUARD_WEIGHT_OUT_OF_RANGE",
            Self::EmptyToken => "GUARD_EMPTY_TOKEN",
        }
    }
}
