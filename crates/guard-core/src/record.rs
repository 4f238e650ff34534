//! Entity, risk and masking records passed between pipeline stages.

use crate::{EntityLabel, GuardError, GuardResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token annotated by the token classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    /// Whitespace-delimited token as it appears in the text.
    pub token: String,
    /// BIO entity label.
    pub entity_label: EntityLabel,
}

impl EntityAnnotation {
    /// Creates a new annotation.
    pub fn new(token: impl Into<String>, entity_label: impl Into<EntityLabel>) -> Self {
        Self {
            token: token.into(),
            entity_label: entity_label.into(),
        }
    }

    /// Creates an annotation, rejecting empty tokens.
    pub fn try_new(token: impl Into<String>, entity_label: impl Into<EntityLabel>) -> GuardResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(GuardError::EmptyToken);
        }
        Ok(Self::new(token, entity_label))
    }

    /// Creates an annotation outside any entity.
    pub fn outside(token: impl Into<String>) -> Self {
        Self::new(token, EntityLabel::Outside)
    }
}

/// Re-identification risk category of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    /// Identifies an individual on its own (name, contact).
    Direct,
    /// Identifies only in combination (organization, location, date, disease).
    Indirect,
    /// Not identifying.
    Other,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A risk weight on the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Weight(u8);

impl Weight {
    /// No risk.
    pub const ZERO: Self = Self(0);
    /// Maximum risk.
    pub const MAX: Self = Self(100);

    /// Creates a weight, rejecting values above 100.
    pub fn new(value: u16) -> GuardResult<Self> {
        if value > 100 {
            return Err(GuardError::WeightOutOfRange(value));
        }
        Ok(Self(value as u8))
    }

    /// Creates a weight from a real value, flooring and clamping into range.
    #[must_use]
    pub fn saturating_floor(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Self::ZERO;
        }
        Self(value.floor().min(100.0) as u8)
    }

    /// Creates a weight from a real value, rounding half to even and clamping.
    #[must_use]
    pub fn saturating_round(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Self::ZERO;
        }
        let floor = value.floor();
        let rounded = match (value - floor).partial_cmp(&0.5) {
            Some(std::cmp::Ordering::Less) => floor,
            Some(std::cmp::Ordering::Equal) if floor % 2.0 == 0.0 => floor,
            _ => floor + 1.0,
        };
        Self(rounded.min(100.0) as u8)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns true if the weight is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the weight meets a masking threshold.
    #[must_use]
    pub const fn meets(self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Weight {
    type Error = GuardError;

    fn try_from(value: u16) -> GuardResult<Self> {
        Self::new(value)
    }
}

impl From<Weight> for u16 {
    fn from(weight: Weight) -> Self {
        u16::from(weight.0)
    }
}

/// Risk weight assigned to a single annotated entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeight {
    /// Token text.
    pub token: String,
    /// BIO entity label.
    pub entity_label: EntityLabel,
    /// Risk category derived from the label.
    pub category: RiskCategory,
    /// Risk weight.
    pub weight: Weight,
    /// Dependency feature names used for the weight, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_feature_key: Option<String>,
}

impl RiskWeight {
    /// Returns a copy with a different weight; everything else is preserved.
    #[must_use]
    pub fn with_weight(&self, weight: Weight) -> Self {
        Self {
            weight,
            ..self.clone()
        }
    }

    /// Returns true if the entity is outside any entity span.
    #[must_use]
    pub fn is_outside(&self) -> bool {
        self.entity_label.is_outside()
    }
}

/// One substitution performed by the masking stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingLogEntry {
    /// Token that was replaced.
    pub token: String,
    /// Label of the entity that triggered the replacement.
    pub entity_label: EntityLabel,
    /// Adjusted risk weight at masking time.
    pub risk_weight: Weight,
    /// Placeholder that replaced the token.
    #[serde(rename = "masked_as")]
    pub placeholder: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Which annotator produced the entity labels for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// A trained token classifier.
    ModelBacked {
        /// Classifier name.
        name: String,
    },
    /// Deterministic heuristic fallback.
    RuleBased,
    /// Annotations passed in by the caller.
    Supplied,
}

impl ModelSource {
    /// Returns true if weighting was done on heuristic labels.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::RuleBased)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelBacked { name } => write!(f, "model ({name})"),
            Self::RuleBased => f.write_str("rule-based fallback"),
            Self::Supplied => f.write_str("caller-supplied annotations"),
        }
    }
}

/// Final result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingResult {
    /// Input text.
    pub original_text: String,
    /// Text with high-risk tokens replaced by placeholders.
    pub masked_text: String,
    /// Substitutions in processing order.
    pub audit_log: Vec<MaskingLogEntry>,
    /// Number of entities outside the `O` label.
    pub total_entity_count: usize,
    /// Number of substitutions performed.
    pub masked_entity_count: usize,
    /// Annotator that produced the labels.
    pub model_source: ModelSource,
}

impl MaskingResult {
    /// Returns the result tagged with the annotator that produced its labels.
    #[must_use]
    pub fn with_model_source(mut self, model_source: ModelSource) -> Self {
        self.model_source = model_source;
        self
    }

    /// Returns true if nothing was masked.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.masked_entity_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityType;

    #[test]
    fn test_weight_bounds() {
        assert_eq!(Weight::new(100).unwrap(), Weight::MAX);
        assert_eq!(Weight::new(101), Err(GuardError::WeightOutOfRange(101)));
        assert_eq!(Weight::saturating_floor(153.9), Weight::MAX);
        assert_eq!(Weight::saturating_floor(64.8).value(), 64);
        assert_eq!(Weight::saturating_round(64.6).value(), 65);
        assert_eq!(Weight::saturating_round(-3.0), Weight::ZERO);
        assert_eq!(Weight::saturating_floor(f64::NAN), Weight::ZERO);
    }

    #[test]
    fn test_weight_round_ties_to_even() {
        assert_eq!(Weight::saturating_round(64.5).value(), 64);
        assert_eq!(Weight::saturating_round(62.5).value(), 62);
        assert_eq!(Weight::saturating_round(63.5).value(), 64);
        assert_eq!(Weight::saturating_round(0.5), Weight::ZERO);
        assert_eq!(Weight::saturating_round(99.5), Weight::MAX);
        assert_eq!(Weight::saturating_round(100.4), Weight::MAX);
        // Risk 0.705 from a 295-in-1000 match rate lands exactly on 70.5.
        assert_eq!(Weight::saturating_round((1.0 - 295.0 / 1000.0) * 100.0).value(), 70);
    }

    #[test]
    fn test_weight_threshold() {
        let w = Weight::new(50).unwrap();
        assert!(w.meets(50));
        assert!(!w.meets(51));
        assert!(!Weight::MAX.meets(101));
    }

    #[test]
    fn test_weight_deserialize_rejects_out_of_range() {
        let ok: Weight = serde_json::from_str("42").unwrap();
        assert_eq!(ok.value(), 42);
        assert!(serde_json::from_str::<Weight>("250").is_err());
    }

    #[test]
    fn test_annotation_rejects_empty_token() {
        assert_eq!(EntityAnnotation::try_new("", "B-PER"), Err(GuardError::EmptyToken));
        let ann = EntityAnnotation::try_new("김철수씨가", "B-PER").unwrap();
        assert_eq!(ann.entity_label.entity_type(), Some(&EntityType::Person));
    }

    #[test]
    fn test_with_weight_preserves_fields() {
        let rw = RiskWeight {
            token: "서울대병원에서".into(),
            entity_label: EntityLabel::parse("B-ORG"),
            category: RiskCategory::Indirect,
            weight: Weight::new(30).unwrap(),
            dependency_feature_key: Some("institution_seoul".into()),
        };
        let adjusted = rw.with_weight(Weight::new(64).unwrap());

        assert_eq!(adjusted.weight.value(), 64);
        assert_eq!(adjusted.token, rw.token);
        assert_eq!(adjusted.category, rw.category);
        assert_eq!(adjusted.dependency_feature_key, rw.dependency_feature_key);
    }

    #[test]
    fn test_log_entry_field_names() {
        let entry = MaskingLogEntry {
            token: "박영희".into(),
            entity_label: EntityLabel::parse("B-PER"),
            risk_weight: Weight::MAX,
            placeholder: "[PERSON]".into(),
            reason: "risk 100 >= threshold 50".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["masked_as"], "[PERSON]");
        assert_eq!(json["risk_weight"], 100);
        assert_eq!(json["entity_label"], "B-PERSON");
    }

    #[test]
    fn test_model_source() {
        assert!(ModelSource::RuleBased.is_degraded());
        assert!(!ModelSource::Supplied.is_degraded());
        assert_eq!(serde_json::to_value(ModelSource::Supplied).unwrap()["kind"], "supplied");
        let source = ModelSource::ModelBacked { name: "koelectra".into() };
        assert!(!source.is_degraded());
        assert_eq!(serde_json::to_value(&source).unwrap()["kind"], "model_backed");
    }
}
