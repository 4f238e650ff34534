//! Threshold-based token masking.

use guard_core::{MaskingLogEntry, MaskingResult, ModelSource, RiskWeight};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Placeholder for entity types without a table entry.
pub const DEFAULT_PLACEHOLDER: &str = "[MASKED]";

/// Entity type → placeholder mapping.
#[derive(Debug, Clone)]
pub struct PlaceholderTable {
    entries: HashMap<String, String>,
    fallback: String,
}

impl Default for PlaceholderTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderTable {
    /// Creates the built-in table.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
            fallback: DEFAULT_PLACEHOLDER.to_string(),
        };
        for (entity_type, placeholder) in [
            ("PERSON", "[PERSON]"),
            ("ORGANIZATION", "[HOSPITAL]"),
            ("LOCATION", "[LOCATION]"),
            ("DATE", "[DATE]"),
            ("DISEASE", "[DISEASE]"),
            ("CONTACT", "[CONTACT]"),
            ("TITLE", "[TITLE]"),
            ("NUMBER", "[NUMBER]"),
        ] {
            table.add(entity_type, placeholder);
        }
        table
    }

    /// Adds or replaces a placeholder. Type names are matched upper-cased.
    pub fn add(&mut self, entity_type: &str, placeholder: impl Into<String>) {
        self.entries
            .insert(entity_type.to_uppercase(), placeholder.into());
    }

    /// Returns the placeholder for a bare type name.
    #[must_use]
    pub fn placeholder(&self, entity_type: &str) -> &str {
        self.entries
            .get(&entity_type.to_uppercase())
            .unwrap_or(&self.fallback)
    }

    /// Returns entries sorted by type name.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Returns the fallback placeholder.
    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

/// Replaces high-risk tokens with placeholders and records each replacement.
#[derive(Debug, Clone, Default)]
pub struct MaskingExecutor {
    placeholders: PlaceholderTable,
}

impl MaskingExecutor {
    /// Creates an executor with the built-in placeholders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor with custom placeholders.
    #[must_use]
    pub fn with_placeholders(placeholders: PlaceholderTable) -> Self {
        Self { placeholders }
    }

    /// Returns the placeholder table.
    #[must_use]
    pub fn placeholders(&self) -> &PlaceholderTable {
        &self.placeholders
    }

    /// Masks `text`.
    ///
    /// Entries are visited by descending weight, ties in input order. Each
    /// entry at or above `threshold` replaces the first remaining occurrence
    /// of its token. A token no longer present (already replaced, or never
    /// there) is skipped. The result is tagged [`ModelSource::Supplied`];
    /// the pipeline retags it with the annotator it used.
    #[must_use]
    pub fn execute(&self, text: &str, weights: &[RiskWeight], threshold: u8) -> MaskingResult {
        let total_entity_count = weights.iter().filter(|w| !w.is_outside()).count();

        let mut ordered: Vec<&RiskWeight> = weights.iter().collect();
        ordered.sort_by(|a, b| b.weight.cmp(&a.weight));

        let mut masked_text = text.to_string();
        let mut audit_log = Vec::new();

        for entry in ordered {
            if entry.is_outside() || !entry.weight.meets(threshold) || entry.token.is_empty() {
                continue;
            }

            let Some(start) = masked_text.find(entry.token.as_str()) else {
                tracing::debug!(token = %entry.token, "token not found in text, skipping");
                continue;
            };

            let placeholder = self.placeholders.placeholder(entry.entity_label.bare_type());
            masked_text.replace_range(start..start + entry.token.len(), placeholder);

            audit_log.push(MaskingLogEntry {
                token: entry.token.clone(),
                entity_label: entry.entity_label.clone(),
                risk_weight: entry.weight,
                placeholder: placeholder.to_string(),
                reason: format!("risk {} >= threshold {}", entry.weight, threshold),
            });
        }

        MaskingResult {
            original_text: text.to_string(),
            masked_text,
            masked_entity_count: audit_log.len(),
            audit_log,
            total_entity_count,
            model_source: ModelSource::Supplied,
        }
    }
}

/// Summary of one masking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingStats {
    /// Tagged entities.
    pub total_entities: usize,
    /// Substitutions performed.
    pub masked_entities: usize,
    /// Mean weight of masked entities, 0 if none.
    pub avg_risk: f64,
    /// Substitutions per placeholder.
    pub by_placeholder: BTreeMap<String, usize>,
    /// Wall-clock time of the run.
    pub processing_time_ms: u64,
}

impl MaskingStats {
    /// Derives statistics from a result.
    #[must_use]
    pub fn from_result(result: &MaskingResult, elapsed: Duration) -> Self {
        let mut by_placeholder = BTreeMap::new();
        for entry in &result.audit_log {
            *by_placeholder.entry(entry.placeholder.clone()).or_insert(0) += 1;
        }

        let avg_risk = if result.audit_log.is_empty() {
            0.0
        } else {
            let sum: u32 = result
                .audit_log
                .iter()
                .map(|e| u32::from(e.risk_weight.value()))
                .sum();
            f64::from(sum) / result.audit_log.len() as f64
        };

        Self {
            total_entities: result.total_entity_count,
            masked_entities: result.masked_entity_count,
            avg_risk,
            by_placeholder,
            processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns the fraction of entities masked.
    #[must_use]
    pub fn masking_rate(&self) -> f64 {
        if self.total_entities == 0 {
            0.0
        } else {
            self.masked_entities as f64 / self.total_entities as f64
        }
    }
}
