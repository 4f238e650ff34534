//! Contextual risk adjustment.
//!
//! Entity types that co-occur in one text, and sensitive clinical keywords in
//! the text, make each identifier easier to link. The adjuster scales every
//! non-zero weight by the strongest matching combination rule and the
//! strongest matching keyword, then clamps to 100.

use crate::{AnonymizeError, AnonymizeResult};
use guard_core::{EntityType, RiskWeight, Weight};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A set of entity types whose joint presence raises risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRule {
    /// Types that must all be present.
    pub types: Vec<EntityType>,
    /// Multiplier applied when they are.
    pub multiplier: f64,
}

impl CombinationRule {
    /// Returns true if every type of the rule is present.
    #[must_use]
    pub fn matches(&self, present: &HashSet<EntityType>) -> bool {
        self.types.iter().all(|t| present.contains(t))
    }
}

/// A sensitive keyword whose presence anywhere in the text raises risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskKeyword {
    /// Literal substring.
    pub keyword: String,
    /// Multiplier applied when it occurs.
    pub multiplier: f64,
}

/// Multipliers found for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAnalysis {
    /// Entity types present among tagged entities.
    pub entity_types: Vec<EntityType>,
    /// Strongest matching combination multiplier, 1.0 if none.
    pub combination_multiplier: f64,
    /// Keywords found in the text.
    pub keywords_found: Vec<String>,
    /// Strongest matching keyword multiplier, 1.0 if none.
    pub keyword_multiplier: f64,
}

impl ContextAnalysis {
    /// Returns the combined factor applied to weights.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.combination_multiplier * self.keyword_multiplier
    }
}

/// Rescales risk weights from sentence-level context.
#[derive(Debug, Clone)]
pub struct ContextualRiskAdjuster {
    combinations: Vec<CombinationRule>,
    keywords: Vec<RiskKeyword>,
}

impl Default for ContextualRiskAdjuster {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextualRiskAdjuster {
    /// Creates an adjuster with the built-in rules and keywords.
    #[must_use]
    pub fn new() -> Self {
        let mut adjuster = Self::empty();
        adjuster.add_builtin_combinations();
        adjuster.add_builtin_keywords();
        adjuster
    }

    /// Creates an adjuster with no rules; every multiplier is 1.0.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            combinations: Vec::new(),
            keywords: Vec::new(),
        }
    }

    fn add_builtin_combinations(&mut self) {
        use EntityType::{Contact, Date, Disease, Organization, Person};

        let builtin = [
            (vec![Person, Organization, Date], 1.5),
            (vec![Person, Disease, Organization], 1.8),
            (vec![Person, Contact], 2.0),
            (vec![Organization, Date, Disease], 1.3),
        ];
        for (types, multiplier) in builtin {
            self.combinations.push(CombinationRule { types, multiplier });
        }
    }

    fn add_builtin_keywords(&mut self) {
        // Procedures
        for keyword in ["진단", "수술", "입원", "치료"] {
            self.push_keyword(keyword, 1.2);
        }
        // Serious conditions
        for keyword in ["암", "종양", "질환"] {
            self.push_keyword(keyword, 1.3);
        }
        // Acute care
        for keyword in ["응급", "중환자"] {
            self.push_keyword(keyword, 1.5);
        }
    }

    fn push_keyword(&mut self, keyword: &str, multiplier: f64) {
        self.keywords.push(RiskKeyword {
            keyword: keyword.to_string(),
            multiplier,
        });
    }

    /// Adds a combination rule. Multipliers below 1.0 are rejected.
    pub fn add_combination(&mut self, types: Vec<EntityType>, multiplier: f64) -> AnonymizeResult<()> {
        check_multiplier(multiplier)?;
        if types.is_empty() {
            return Err(AnonymizeError::InvalidConfig(
                "combination rule needs at least one entity type".into(),
            ));
        }
        self.combinations.push(CombinationRule { types, multiplier });
        Ok(())
    }

    /// Adds a keyword. Multipliers below 1.0 are rejected.
    pub fn add_keyword(&mut self, keyword: impl Into<String>, multiplier: f64) -> AnonymizeResult<()> {
        check_multiplier(multiplier)?;
        let keyword = keyword.into();
        if keyword.is_empty() {
            return Err(AnonymizeError::InvalidConfig("empty risk keyword".into()));
        }
        self.keywords.push(RiskKeyword { keyword, multiplier });
        Ok(())
    }

    /// Returns the combination rules.
    #[must_use]
    pub fn combinations(&self) -> &[CombinationRule] {
        &self.combinations
    }

    /// Returns the keywords.
    #[must_use]
    pub fn keywords(&self) -> &[RiskKeyword] {
        &self.keywords
    }

    /// Returns the strongest multiplier among rules satisfied by `present`.
    #[must_use]
    pub fn combination_multiplier(&self, present: &HashSet<EntityType>) -> f64 {
        self.combinations
            .iter()
            .filter(|rule| rule.matches(present))
            .map(|rule| rule.multiplier)
            .fold(1.0, f64::max)
    }

    /// Returns the strongest multiplier among keywords occurring in `text`.
    #[must_use]
    pub fn keyword_multiplier(&self, text: &str) -> f64 {
        self.keywords
            .iter()
            .filter(|k| text.contains(k.keyword.as_str()))
            .map(|k| k.multiplier)
            .fold(1.0, f64::max)
    }

    /// Computes the multipliers for a text and its weighted entities.
    #[must_use]
    pub fn analyze(&self, text: &str, weights: &[RiskWeight]) -> ContextAnalysis {
        let present: HashSet<EntityType> = weights
            .iter()
            .filter_map(|w| w.entity_label.entity_type().cloned())
            .collect();

        let mut entity_types: Vec<EntityType> = present.iter().cloned().collect();
        entity_types.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let keywords_found = self
            .keywords
            .iter()
            .filter(|k| text.contains(k.keyword.as_str()))
            .map(|k| k.keyword.clone())
            .collect();

        ContextAnalysis {
            combination_multiplier: self.combination_multiplier(&present),
            keyword_multiplier: self.keyword_multiplier(text),
            entity_types,
            keywords_found,
        }
    }

    /// Returns adjusted weights in the same order.
    ///
    /// Zero weights stay zero; others become `min(100, floor(w × factor))`.
    #[must_use]
    pub fn adjust(&self, text: &str, weights: &[RiskWeight]) -> Vec<RiskWeight> {
        let analysis = self.analyze(text, weights);
        self.adjust_with(&analysis, weights)
    }

    /// Applies an existing analysis to `weights`.
    #[must_use]
    pub fn adjust_with(&self, analysis: &ContextAnalysis, weights: &[RiskWeight]) -> Vec<RiskWeight> {
        tracing::debug!(
            combination = analysis.combination_multiplier,
            keyword = analysis.keyword_multiplier,
            keywords = ?analysis.keywords_found,
            "contextual multipliers"
        );

        weights
            .iter()
            .map(|w| {
                if w.weight.is_zero() {
                    w.clone()
                } else {
                    let scaled = f64::from(w.weight.value())
                        * analysis.combination_multiplier
                        * analysis.keyword_multiplier;
                    w.with_weight(Weight::saturating_floor(scaled).max(w.weight))
                }
            })
            .collect()
    }
}

fn check_multiplier(multiplier: f64) -> AnonymizeResult<()> {
    if multiplier.is_nan() || multiplier < 1.0 {
        return Err(AnonymizeError::InvalidConfig(format!(
            "risk multiplier must be at least 1.0, got {multiplier}"
        )));
    }
    Ok(())
}
