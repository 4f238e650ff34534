//! Per-entity risk weighting.

use crate::category::EntityCategorizer;
use crate::sampler::{FeatureTable, RiskEstimator};
use crate::AnonymizeResult;
use guard_core::{EntityAnnotation, RiskCategory, RiskWeight, Weight};
use std::sync::Arc;

/// Assigns a 0-100 risk weight to each annotated entity.
///
/// Direct identifiers always weigh 100 and non-identifying tokens 0. Indirect
/// identifiers found in the feature table are weighted by the rarity of their
/// feature combination; the rest get the configured default.
#[derive(Clone)]
pub struct RiskWeightCalculator {
    categorizer: EntityCategorizer,
    estimator: Arc<dyn RiskEstimator>,
    features: FeatureTable,
    default_indirect_weight: Weight,
}

impl RiskWeightCalculator {
    /// Creates a calculator, checking the feature table against the estimator's columns.
    pub fn new(
        estimator: Arc<dyn RiskEstimator>,
        features: FeatureTable,
        default_indirect_weight: Weight,
    ) -> AnonymizeResult<Self> {
        features.validate_against(estimator.as_ref())?;
        Ok(Self {
            categorizer: EntityCategorizer::new(),
            estimator,
            features,
            default_indirect_weight,
        })
    }

    /// Returns the feature table.
    #[must_use]
    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    /// Weights each entity, preserving order.
    pub fn compute_weights(&self, entities: &[EntityAnnotation]) -> AnonymizeResult<Vec<RiskWeight>> {
        entities.iter().map(|e| self.weigh(e)).collect()
    }

    fn weigh(&self, entity: &EntityAnnotation) -> AnonymizeResult<RiskWeight> {
        let category = self.categorizer.categorize(&entity.entity_label);

        let (weight, dependency_feature_key) = match category {
            RiskCategory::Direct => (Weight::MAX, None),
            RiskCategory::Other => (Weight::ZERO, None),
            RiskCategory::Indirect => match self.features.lookup(&entity.token) {
                Some(query) => {
                    let risk = self.estimator.estimate_risk(query)?;
                    (Weight::saturating_round(risk * 100.0), Some(query.feature_key()))
                }
                None => (self.default_indirect_weight, None),
            },
        };

        Ok(RiskWeight {
            token: entity.token.clone(),
            entity_label: entity.entity_label.clone(),
            category,
            weight,
            dependency_feature_key,
        })
    }
}

impl std::fmt::Debug for RiskWeightCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskWeightCalculator")
            .field("features", &self.features.len())
            .field("default_indirect_weight", &self.default_indirect_weight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{FeatureQuery, FixedRiskEstimator};
    use crate::AnonymizeError;

    fn calculator(risk: f64) -> RiskWeightCalculator {
        RiskWeightCalculator::new(
            Arc::new(FixedRiskEstimator::builtin(risk)),
            FeatureTable::builtin(),
            Weight::new(30).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_direct_other_and_default() {
        let weights = calculator(0.7)
            .compute_weights(&[
                EntityAnnotation::new("김철수씨가", "B-PER"),
                EntityAnnotation::new("010-1234-5678", "B-CONTACT"),
                EntityAnnotation::new("진단을", "O"),
                EntityAnnotation::new("강남세브란스", "B-ORG"),
                EntityAnnotation::new("과장", "B-CVL"),
            ])
            .unwrap();

        let values: Vec<u8> = weights.iter().map(|w| w.weight.value()).collect();
        assert_eq!(values, vec![100, 100, 0, 30, 0]);
        assert!(weights.iter().all(|w| w.dependency_feature_key.is_none()));
    }

    #[test]
    fn test_mapped_indirect_uses_estimator() {
        let weights = calculator(0.704)
            .compute_weights(&[
                EntityAnnotation::new("서울대병원에서", "B-ORG"),
                EntityAnnotation::new("간암", "B-DISEASE"),
            ])
            .unwrap();

        assert_eq!(weights[0].weight.value(), 70);
        assert_eq!(weights[0].category, RiskCategory::Indirect);
        assert!(weights[0]
            .dependency_feature_key
            .as_deref()
            .unwrap()
            .contains("institution_서울대병원"));
        assert_eq!(weights[1].weight.value(), 70);
    }

    #[test]
    fn test_half_point_risk_rounds_to_even() {
        let entities = [EntityAnnotation::new("간암", "B-DISEASE")];

        let weights = calculator(1.0 - 295.0 / 1000.0).compute_weights(&entities).unwrap();
        assert_eq!(weights[0].weight.value(), 70);

        let weights = calculator(0.625).compute_weights(&entities).unwrap();
        assert_eq!(weights[0].weight.value(), 62);

        let weights = calculator(0.635).compute_weights(&entities).unwrap();
        assert_eq!(weights[0].weight.value(), 64);
    }

    #[test]
    fn test_order_and_length_preserved() {
        let entities = vec![
            EntityAnnotation::new("2023년", "B-DATE"),
            EntityAnnotation::new("박영희", "B-PER"),
            EntityAnnotation::new("2023년", "B-DATE"),
        ];
        let weights = calculator(0.5).compute_weights(&entities).unwrap();

        assert_eq!(weights.len(), entities.len());
        for (w, e) in weights.iter().zip(&entities) {
            assert_eq!(w.token, e.token);
        }
    }

    #[test]
    fn test_zero_risk_gives_zero_weight() {
        let weights = calculator(0.0)
            .compute_weights(&[EntityAnnotation::new("간암", "B-DISEASE")])
            .unwrap();
        assert!(weights[0].weight.is_zero());
    }

    #[test]
    fn test_table_must_match_estimator() {
        let mut table = FeatureTable::new();
        table.insert("병원", FeatureQuery::new().with("institution_nowhere", 1));

        let err = RiskWeightCalculator::new(
            Arc::new(FixedRiskEstimator::builtin(0.5)),
            table,
            Weight::new(30).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, AnonymizeError::UnknownFeature(_)));
    }
}
