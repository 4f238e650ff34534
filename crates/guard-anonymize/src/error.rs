//! Anonymization error types.

use guard_core::GuardError;
use thiserror::Error;

/// Anonymization result type.
pub type AnonymizeResult<T> = Result<T, AnonymizeError>;

/// Anonymization errors.
#[derive(Error, Debug)]
pub enum AnonymizeError {
    /// Risk query named a column the sampler does not have.
    #[error("Unknown dependency feature: {0}")]
    UnknownFeature(String),

    /// Risk query used a value other than 0 or 1.
    #[error("Invalid value {value} for dependency feature {feature} (expected 0 or 1)")]
    InvalidFeatureValue {
        /// Feature name.
        feature: String,
        /// Offending value.
        value: u8,
    },

    /// The dependency model could not be fitted.
    #[error("Sampler fit failed: {0}")]
    SamplerFit(String),

    /// The token classifier could not be loaded or failed during inference.
    #[error("Entity annotator unavailable: {0}")]
    AnnotatorUnavailable(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration load error: {0}")]
    ConfigLoad(String),

    /// Core record error.
    #[error(transparent)]
    Core(#[from] GuardError),
}

impl AnonymizeError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownFeature(_) => "ANON_UNKNOWN_FEATURE",
            Self::InvalidFeatureValue { .. } => "ANON_INVALID_FEATURE_VALUE",
            Self::SamplerFit(_) => "ANON_SAMPLER_FIT",
            Self::AnnotatorUnavailable(_) => "ANON_ANNOTATOR_UNAVAILABLE",
            Self::InvalidConfig(_) => "ANON_INVALID_CONFIG",
            Self::ConfigLoad(_) => "ANON_CONFIG_LOAD",
            Self::Core(e) => e.code(),
        }
    }

    /// Returns true if the pipeline can continue on a degraded path.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AnnotatorUnavailable(_))
    }
}

impl From<toml::de::Error> for AnonymizeError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigLoad(e.to_string())
    }
}
