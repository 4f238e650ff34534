//! Risk-weighted de-identification of Korean clinical text.
//!
//! Tokens are annotated with BIO entity labels, weighted by how identifying
//! they are (directly, or through the rarity of institution × condition × date
//! combinations), rescaled from sentence context, and masked above a
//! threshold with every substitution logged.

pub mod error;
pub mod category;
pub mod copula;
pub mod sampler;
pub mod weight;
pub mod context;
pub mod masking;
pub mod annotator;
pub mod config;
pub mod pipeline;

pub use error::{AnonymizeError, AnonymizeResult};
pub use category::EntityCategorizer;
pub use copula::GaussianCopula;
pub use sampler::{
    builtin_attributes, CategoricalAttribute, DependencyRiskSampler, FeatureQuery, FeatureTable,
    FixedRiskEstimator, RiskEstimator,
};
pub use weight::RiskWeightCalculator;
pub use context::{CombinationRule, ContextAnalysis, ContextualRiskAdjuster, RiskKeyword};
pub use masking::{MaskingExecutor, MaskingStats, PlaceholderTable, DEFAULT_PLACEHOLDER};
pub use annotator::{EntityAnnotator, ModelBackedAnnotator, RuleBasedAnnotator, TokenClassifier};
pub use config::{PipelineConfig, SamplerConfig};
pub use pipeline::{DeidentificationPipeline, PipelineBuilder, PipelineTrace, ProcessOptions};

/// Re-export common types.
pub use guard_core::{
    EntityAnnotation, EntityLabel, EntityType, MaskingLogEntry, MaskingResult, ModelSource,
    RiskCategory, RiskWeight, Weight,
};
