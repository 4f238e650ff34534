//! Entity annotation backends.
//!
//! A sentence is split on whitespace and every word gets exactly one BIO
//! label. [`ModelBackedAnnotator`] delegates labelling to an external
//! [`TokenClassifier`]; [`RuleBasedAnnotator`] is the deterministic fallback
//! used when no classifier is available.

use crate::{AnonymizeError, AnonymizeResult};
use guard_core::{EntityAnnotation, EntityLabel, EntityType, ModelSource};
use once_cell::sync::Lazy;
use regex::Regex;

/// Labels a sentence, one annotation per whitespace token.
pub trait EntityAnnotator: Send + Sync {
    /// Annotates a sentence.
    fn annotate(&self, text: &str) -> AnonymizeResult<Vec<EntityAnnotation>>;

    /// Identifies the backend for result reporting.
    fn source(&self) -> ModelSource;
}

/// External token classification model.
pub trait TokenClassifier: Send + Sync {
    /// Model name.
    fn name(&self) -> &str;

    /// Returns one raw label per word, e.g. `PER_B`, `B-ORG` or `O`.
    fn classify(&self, words: &[&str]) -> AnonymizeResult<Vec<String>>;
}

/// Annotator backed by a token classification model.
pub struct ModelBackedAnnotator<C> {
    classifier: C,
}

impl<C: TokenClassifier> ModelBackedAnnotator<C> {
    /// Wraps a classifier.
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }
}

impl<C: TokenClassifier> EntityAnnotator for ModelBackedAnnotator<C> {
    fn annotate(&self, text: &str) -> AnonymizeResult<Vec<EntityAnnotation>> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let labels = self.classifier.classify(&words).map_err(|e| match e {
            unavailable @ AnonymizeError::AnnotatorUnavailable(_) => unavailable,
            other => AnonymizeError::AnnotatorUnavailable(other.to_string()),
        })?;

        if labels.len() != words.len() {
            return Err(AnonymizeError::AnnotatorUnavailable(format!(
                "{} returned {} labels for {} words",
                self.classifier.name(),
                labels.len(),
                words.len()
            )));
        }

        Ok(words
            .into_iter()
            .zip(labels)
            .map(|(word, raw)| EntityAnnotation::new(word, EntityLabel::parse(&raw)))
            .collect())
    }

    fn source(&self) -> ModelSource {
        ModelSource::ModelBacked {
            name: self.classifier.name().to_string(),
        }
    }
}

const SURNAMES: [&str; 6] = ["김", "박", "이", "최", "정", "한"];
const INSTITUTION_SUFFIXES: [&str; 3] = ["병원", "의료원", "센터"];
const DATE_PARTICLES: [&str; 3] = ["년", "월", "일"];

static PHONE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:010|02)-").expect("phone prefix pattern is valid"));

/// Keyword heuristics over each token.
///
/// Checks run in order and the first hit wins: surname character → person,
/// institution suffix → organization, date particle → date, phone prefix →
/// contact. The heuristics are coarse; any token containing `이` is a person.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAnnotator;

impl RuleBasedAnnotator {
    /// Creates the annotator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Labels a single token.
    #[must_use]
    pub fn label_token(&self, token: &str) -> EntityLabel {
        let contains_any = |needles: &[&str]| needles.iter().any(|n| token.contains(n));

        let entity_type = if contains_any(&SURNAMES) {
            EntityType::Person
        } else if contains_any(&INSTITUTION_SUFFIXES) {
            EntityType::Organization
        } else if contains_any(&DATE_PARTICLES) {
            EntityType::Date
        } else if PHONE_PREFIX.is_match(token) {
            EntityType::Contact
        } else {
            return EntityLabel::Outside;
        };

        EntityLabel::begin(entity_type)
    }
}

impl EntityAnnotator for RuleBasedAnnotator {
    fn annotate(&self, text: &str) -> AnonymizeResult<Vec<EntityAnnotation>> {
        Ok(text
            .split_whitespace()
            .map(|token| EntityAnnotation::new(token, self.label_token(token)))
            .collect())
    }

    fn source(&self) -> ModelSource {
        ModelSource::RuleBased
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<&'static str>);

    impl TokenClassifier for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn classify(&self, words: &[&str]) -> AnonymizeResult<Vec<String>> {
            Ok(self.0.iter().take(words.len()).map(|s| s.to_string()).collect())
        }
    }

    struct Offline;

    impl TokenClassifier for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn classify(&self, _words: &[&str]) -> AnonymizeResult<Vec<String>> {
            Err(AnonymizeError::InvalidConfig("weights not loaded".into()))
        }
    }

    #[test]
    fn test_model_backed_normalizes_labels() {
        let annotator = ModelBackedAnnotator::new(Scripted(vec!["PER_B", "O", "ORG_B"]));
        let annotations = annotator.annotate("김철수씨가 내일 서울대병원에서").unwrap();

        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[0].entity_label.to_string(), "B-PERSON");
        assert!(annotations[1].entity_label.is_outside());
        assert_eq!(
            annotations[2].entity_label.entity_type(),
            Some(&EntityType::Organization)
        );
        assert_eq!(
            annotator.source(),
            ModelSource::ModelBacked { name: "scripted".into() }
        );
    }

    #[test]
    fn test_model_backed_label_count_mismatch() {
        let annotator = ModelBackedAnnotator::new(Scripted(vec!["O"]));
        let err = annotator.annotate("두 단어").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_model_backed_error_is_recoverable() {
        let annotator = ModelBackedAnnotator::new(Offline);
        let err = annotator.annotate("김철수").unwrap_err();
        assert_eq!(err.code(), "ANON_ANNOTATOR_UNAVAILABLE");
    }

    #[test]
    fn test_model_backed_empty_text() {
        let annotator = ModelBackedAnnotator::new(Offline);
        assert!(annotator.annotate("   ").unwrap().is_empty());
    }

    #[test]
    fn test_rule_based_check_order() {
        let rules = RuleBasedAnnotator::new();
        let label = |t: &str| rules.label_token(t).to_string();

        assert_eq!(label("김철수씨가"), "B-PERSON");
        assert_eq!(label("삼성서울병원에서"), "B-ORGANIZATION");
        assert_eq!(label("2023년"), "B-DATE");
        assert_eq!(label("02-555-1234"), "B-CONTACT");
        assert_eq!(label("검사를"), "O");
        // Surname check runs before the institution check.
        assert_eq!(label("한국병원"), "B-PERSON");
        assert_eq!(label("(010-1234-5678)는"), "B-CONTACT");
        // Date particle check runs before the phone check.
        assert_eq!(label("02-1234일"), "B-DATE");
    }

    #[test]
    fn test_phone_prefix_needs_hyphen() {
        let rules = RuleBasedAnnotator::new();
        assert_eq!(rules.label_token("010-9876-5432").to_string(), "B-CONTACT");
        assert_eq!(rules.label_token("01098765432").to_string(), "O");
        assert_eq!(rules.label_token("302-").to_string(), "B-CONTACT");
    }

    #[test]
    fn test_rule_based_annotates_every_token() {
        let annotations = RuleBasedAnnotator::new()
            .annotate("박영희(010-1234-5678)는 삼성서울병원에서 수술을 받았다.")
            .unwrap();
        assert_eq!(annotations.len(), 4);
        assert_eq!(annotations[0].entity_label.to_string(), "B-PERSON");
        assert_eq!(annotations[1].entity_label.to_string(), "B-ORGANIZATION");
        assert_eq!(RuleBasedAnnotator::new().source(), ModelSource::RuleBased);
    }
}
