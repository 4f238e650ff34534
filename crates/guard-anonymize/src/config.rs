//! Pipeline configuration.

use crate::{AnonymizeError, AnonymizeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum baseline draws and stored samples.
pub const MIN_DRAWS: usize = 1000;

/// Default masking threshold.
pub const DEFAULT_THRESHOLD: u8 = 50;

/// Default weight for indirect identifiers without a feature mapping.
pub const DEFAULT_INDIRECT_WEIGHT: u16 = 30;

/// Dependency sampler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// RNG seed for baseline draws and sampling.
    pub seed: u64,
    /// Number of uniform baseline assignments the copula is fitted on.
    pub baseline_draws: usize,
    /// Number of canonical rows kept for risk queries.
    pub sample_count: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            baseline_draws: MIN_DRAWS,
            sample_count: MIN_DRAWS,
        }
    }
}

impl SamplerConfig {
    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates draw counts.
    pub fn validate(&self) -> AnonymizeResult<()> {
        if self.baseline_draws < MIN_DRAWS {
            return Err(AnonymizeError::InvalidConfig(format!(
                "baseline_draws must be at least {MIN_DRAWS}, got {}",
                self.baseline_draws
            )));
        }
        if self.sample_count < MIN_DRAWS {
            return Err(AnonymizeError::InvalidConfig(format!(
                "sample_count must be at least {MIN_DRAWS}, got {}",
                self.sample_count
            )));
        }
        Ok(())
    }
}

/// De-identification pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum risk weight that gets masked. Values above 100 disable masking.
    pub threshold: u8,
    /// Apply combination and keyword multipliers.
    pub use_contextual_analysis: bool,
    /// Weight for indirect identifiers missing from the feature table.
    pub default_indirect_weight: u16,
    /// Sampler settings.
    pub sampler: SamplerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            use_contextual_analysis: true,
            default_indirect_weight: DEFAULT_INDIRECT_WEIGHT,
            sampler: SamplerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Sets the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enables or disables contextual analysis.
    #[must_use]
    pub fn with_contextual_analysis(mut self, enabled: bool) -> Self {
        self.use_contextual_analysis = enabled;
        self
    }

    /// Sets the sampler settings.
    #[must_use]
    pub fn with_sampler(mut self, sampler: SamplerConfig) -> Self {
        self.sampler = sampler;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AnonymizeResult<()> {
        if self.default_indirect_weight > 100 {
            return Err(AnonymizeError::InvalidConfig(format!(
                "default_indirect_weight must be at most 100, got {}",
                self.default_indirect_weight
            )));
        }
        self.sampler.validate()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> AnonymizeResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> AnonymizeResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AnonymizeError::ConfigLoad(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }
}
