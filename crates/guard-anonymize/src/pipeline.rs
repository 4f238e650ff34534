//! End-to-end de-identification pipeline.

use crate::annotator::{EntityAnnotator, ModelBackedAnnotator, RuleBasedAnnotator, TokenClassifier};
use crate::config::PipelineConfig;
use crate::context::{ContextAnalysis, ContextualRiskAdjuster};
use crate::masking::{MaskingExecutor, MaskingStats, PlaceholderTable};
use crate::sampler::{DependencyRiskSampler, FeatureTable, RiskEstimator};
use crate::weight::RiskWeightCalculator;
use crate::{AnonymizeError, AnonymizeResult};
use guard_core::{EntityAnnotation, MaskingResult, ModelSource, RiskWeight, Weight};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-call overrides of the pipeline defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Masking threshold; the configured threshold if `None`.
    pub threshold: Option<u8>,
    /// Contextual adjustment switch; the configured value if `None`.
    pub use_contextual_analysis: Option<bool>,
}

impl ProcessOptions {
    /// Creates options that use every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Overrides contextual analysis.
    #[must_use]
    pub fn with_contextual_analysis(mut self, enabled: bool) -> Self {
        self.use_contextual_analysis = Some(enabled);
        self
    }
}

/// Intermediate state of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTrace {
    /// Annotations produced by the annotator.
    pub annotations: Vec<EntityAnnotation>,
    /// Weights before contextual adjustment.
    pub base_weights: Vec<RiskWeight>,
    /// Contextual multipliers, if adjustment ran.
    pub context: Option<ContextAnalysis>,
    /// Weights handed to the masking stage.
    pub final_weights: Vec<RiskWeight>,
    /// Threshold used for masking.
    pub threshold: u8,
    /// Final result.
    pub result: MaskingResult,
    /// Wall-clock time of the run.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl PipelineTrace {
    /// Returns masking statistics for the run.
    #[must_use]
    pub fn stats(&self) -> MaskingStats {
        MaskingStats::from_result(&self.result, self.elapsed)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        u64::try_from(d.as_millis()).unwrap_or(u64::MAX).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Annotate → weight → adjust → mask.
///
/// Every table and the fitted sampler are read-only after construction, so a
/// pipeline can be shared across threads. The stored threshold is only a
/// default; callers pass their own through [`ProcessOptions`].
pub struct DeidentificationPipeline {
    config: PipelineConfig,
    annotator: Box<dyn EntityAnnotator>,
    fallback: RuleBasedAnnotator,
    calculator: RiskWeightCalculator,
    adjuster: ContextualRiskAdjuster,
    executor: MaskingExecutor,
}

impl DeidentificationPipeline {
    /// Creates a pipeline with the rule-based annotator and a freshly fitted sampler.
    pub fn new(config: PipelineConfig) -> AnonymizeResult<Self> {
        Self::builder().config(config).build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the default threshold.
    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.config.threshold
    }

    /// Sets the default threshold.
    pub fn set_threshold(&mut self, threshold: u8) {
        self.config.threshold = threshold;
    }

    /// Returns the annotator in use.
    #[must_use]
    pub fn model_source(&self) -> ModelSource {
        self.annotator.source()
    }

    /// Returns the placeholder table.
    #[must_use]
    pub fn placeholders(&self) -> &PlaceholderTable {
        self.executor.placeholders()
    }

    /// De-identifies a text.
    pub fn process(&self, text: &str, options: &ProcessOptions) -> AnonymizeResult<MaskingResult> {
        self.process_traced(text, options).map(|trace| trace.result)
    }

    /// De-identifies a text and returns every intermediate stage.
    pub fn process_traced(&self, text: &str, options: &ProcessOptions) -> AnonymizeResult<PipelineTrace> {
        let start = Instant::now();
        let (annotations, source) = self.annotate(text)?;
        debug!(tokens = annotations.len(), source = %source, "annotation complete");
        self.run(text, annotations, source, options, start)
    }

    /// De-identifies a text using annotations supplied by the caller.
    pub fn process_annotated(
        &self,
        text: &str,
        annotations: &[EntityAnnotation],
        options: &ProcessOptions,
    ) -> AnonymizeResult<MaskingResult> {
        self.process_annotated_traced(text, annotations, options)
            .map(|trace| trace.result)
    }

    /// Like [`process_annotated`](Self::process_annotated), returning every stage.
    pub fn process_annotated_traced(
        &self,
        text: &str,
        annotations: &[EntityAnnotation],
        options: &ProcessOptions,
    ) -> AnonymizeResult<PipelineTrace> {
        self.run(text, annotations.to_vec(), ModelSource::Supplied, options, Instant::now())
    }

    fn annotate(&self, text: &str) -> AnonymizeResult<(Vec<EntityAnnotation>, ModelSource)> {
        match self.annotator.annotate(text) {
            Ok(annotations) => Ok((annotations, self.annotator.source())),
            Err(e) => {
                warn!(
                    code = e.code(),
                    error = %e,
                    "annotator failed, falling back to rule-based annotation"
                );
                let annotations = self.fallback.annotate(text)?;
                Ok((annotations, self.fallback.source()))
            }
        }
    }

    fn run(
        &self,
        text: &str,
        annotations: Vec<EntityAnnotation>,
        source: ModelSource,
        options: &ProcessOptions,
        start: Instant,
    ) -> AnonymizeResult<PipelineTrace> {
        let threshold = options.threshold.unwrap_or(self.config.threshold);
        let contextual = options
            .use_contextual_analysis
            .unwrap_or(self.config.use_contextual_analysis);

        let base_weights = self.calculator.compute_weights(&annotations)?;
        debug!(
            weighted = base_weights.iter().filter(|w| !w.weight.is_zero()).count(),
            "risk weights computed"
        );

        let (context, final_weights) = if contextual {
            let analysis = self.adjuster.analyze(text, &base_weights);
            let adjusted = self.adjuster.adjust_with(&analysis, &base_weights);
            (Some(analysis), adjusted)
        } else {
            (None, base_weights.clone())
        };

        let result = self
            .executor
            .execute(text, &final_weights, threshold)
            .with_model_source(source);
        let elapsed = start.elapsed();

        info!(
            total = result.total_entity_count,
            masked = result.masked_entity_count,
            threshold,
            source = %result.model_source,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "text de-identified"
        );

        Ok(PipelineTrace {
            annotations,
            base_weights,
            context,
            final_weights,
            threshold,
            result,
            elapsed,
        })
    }
}

impl std::fmt::Debug for DeidentificationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeidentificationPipeline")
            .field("config", &self.config)
            .field("annotator", &self.annotator.source())
            .field("calculator", &self.calculator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DeidentificationPipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    annotator: Option<Box<dyn EntityAnnotator>>,
    estimator: Option<Arc<dyn RiskEstimator>>,
    features: Option<FeatureTable>,
    adjuster: Option<ContextualRiskAdjuster>,
    placeholders: Option<PlaceholderTable>,
}

impl PipelineBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a token classifier for annotation.
    #[must_use]
    pub fn classifier<C: TokenClassifier + 'static>(mut self, classifier: C) -> Self {
        self.annotator = Some(Box::new(ModelBackedAnnotator::new(classifier)));
        self
    }

    /// Uses a classifier if it loaded, the rule-based annotator otherwise.
    #[must_use]
    pub fn classifier_result<C: TokenClassifier + 'static>(self, loaded: AnonymizeResult<C>) -> Self {
        match loaded {
            Ok(classifier) => self.classifier(classifier),
            Err(e) => {
                warn!(code = e.code(), error = %e, "classifier unavailable, using rule-based annotation");
                self.annotator(RuleBasedAnnotator::new())
            }
        }
    }

    /// Uses a custom annotator.
    #[must_use]
    pub fn annotator<A: EntityAnnotator + 'static>(mut self, annotator: A) -> Self {
        self.annotator = Some(Box::new(annotator));
        self
    }

    /// Uses a custom risk estimator instead of fitting the dependency sampler.
    #[must_use]
    pub fn estimator(mut self, estimator: Arc<dyn RiskEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Uses a custom feature table.
    #[must_use]
    pub fn features(mut self, features: FeatureTable) -> Self {
        self.features = Some(features);
        self
    }

    /// Uses a custom contextual adjuster.
    #[must_use]
    pub fn adjuster(mut self, adjuster: ContextualRiskAdjuster) -> Self {
        self.adjuster = Some(adjuster);
        self
    }

    /// Uses custom placeholders.
    #[must_use]
    pub fn placeholders(mut self, placeholders: PlaceholderTable) -> Self {
        self.placeholders = Some(placeholders);
        self
    }

    /// Validates the configuration and builds the pipeline.
    pub fn build(self) -> AnonymizeResult<DeidentificationPipeline> {
        self.config.validate()?;

        let estimator = match self.estimator {
            Some(estimator) => estimator,
            None => Arc::new(DependencyRiskSampler::fit_builtin(&self.config.sampler)?),
        };
        let default_weight = Weight::new(self.config.default_indirect_weight)
            .map_err(|e| AnonymizeError::InvalidConfig(e.to_string()))?;
        let calculator = RiskWeightCalculator::new(
            estimator,
            self.features.unwrap_or_else(FeatureTable::builtin),
            default_weight,
        )?;

        let annotator = self
            .annotator
            .unwrap_or_else(|| Box::new(RuleBasedAnnotator::new()));

        info!(
            annotator = %annotator.source(),
            threshold = self.config.threshold,
            contextual = self.config.use_contextual_analysis,
            "de-identification pipeline ready"
        );

        Ok(DeidentificationPipeline {
            config: self.config,
            annotator,
            fallback: RuleBasedAnnotator::new(),
            calculator,
            adjuster: self.adjuster.unwrap_or_default(),
            executor: self
                .placeholders
                .map(MaskingExecutor::with_placeholders)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::FixedRiskEstimator;

    struct Broken;

    impl TokenClassifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn classify(&self, _words: &[&str]) -> AnonymizeResult<Vec<String>> {
            Err(AnonymizeError::AnnotatorUnavailable("inference failed".into()))
        }
    }

    fn fixed_pipeline() -> DeidentificationPipeline {
        DeidentificationPipeline::builder()
            .estimator(Arc::new(FixedRiskEstimator::builtin(0.7)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DeidentificationPipeline>();
    }

    #[test]
    fn test_threshold_default_and_override() {
        let mut pipeline = fixed_pipeline();
        assert_eq!(pipeline.threshold(), 50);
        pipeline.set_threshold(80);
        assert_eq!(pipeline.threshold(), 80);

        let annotations = [EntityAnnotation::new("2023년", "B-DATE")];
        // 70 with no context keywords.
        let options = ProcessOptions::new().with_contextual_analysis(false);
        let at_default = pipeline.process_annotated("2023년", &annotations, &options).unwrap();
        assert_eq!(at_default.masked_entity_count, 0);

        let lowered = pipeline
            .process_annotated("2023년", &annotations, &options.with_threshold(70))
            .unwrap();
        assert_eq!(lowered.masked_text, "[DATE]");
        assert_eq!(lowered.model_source, ModelSource::Supplied);
    }

    #[test]
    fn test_runtime_classifier_failure_falls_back() {
        let pipeline = DeidentificationPipeline::builder()
            .classifier(Broken)
            .estimator(Arc::new(FixedRiskEstimator::builtin(0.7)))
            .build()
            .unwrap();

        let result = pipeline.process("박영희 환자", &ProcessOptions::new()).unwrap();
        assert_eq!(result.model_source, ModelSource::RuleBased);
        assert_eq!(result.masked_text, "[PERSON] 환자");
    }

    #[test]
    fn test_classifier_load_failure_falls_back() {
        let pipeline = DeidentificationPipeline::builder()
            .classifier_result::<Broken>(Err(AnonymizeError::AnnotatorUnavailable("missing".into())))
            .estimator(Arc::new(FixedRiskEstimator::builtin(0.7)))
            .build()
            .unwrap();
        assert_eq!(pipeline.model_source(), ModelSource::RuleBased);
    }

    #[test]
    fn test_trace_records_stages() {
        let pipeline = fixed_pipeline();
        let trace = pipeline
            .process_traced("김철수 서울대병원 간암 진단", &ProcessOptions::new())
            .unwrap();

        assert_eq!(trace.annotations.len(), 4);
        assert_eq!(trace.base_weights.len(), trace.final_weights.len());
        assert!(trace.context.is_some());
        assert_eq!(trace.threshold, 50);
        assert_eq!(trace.stats().masked_entities, trace.result.masked_entity_count);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.default_indirect_weight = 120;
        let err = DeidentificationPipeline::builder()
            .config(config)
            .estimator(Arc::new(FixedRiskEstimator::builtin(0.5)))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "ANON_INVALID_CONFIG");
    }
}
