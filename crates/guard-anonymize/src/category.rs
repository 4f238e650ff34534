//! Entity risk categorization.

use guard_core::{EntityLabel, EntityType, RiskCategory};

/// Maps entity labels to re-identification risk categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityCategorizer;

impl EntityCategorizer {
    /// Creates a categorizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the category for a label. Position is ignored.
    #[must_use]
    pub fn categorize(&self, label: &EntityLabel) -> RiskCategory {
        match label.entity_type() {
            Some(entity_type) => Self::category_of(entity_type),
            None => RiskCategory::Other,
        }
    }

    /// Parses a raw label and returns its category.
    #[must_use]
    pub fn categorize_raw(&self, raw: &str) -> RiskCategory {
        self.categorize(&EntityLabel::parse(raw))
    }

    /// Returns the category for an entity type.
    #[must_use]
    pub fn category_of(entity_type: &EntityType) -> RiskCategory {
        match entity_type {
            EntityType::Person | EntityType::Contact => RiskCategory::Direct,
            EntityType::Organization
            | EntityType::Location
            | EntityType::Date
            | EntityType::Disease => RiskCategory::Indirect,
            EntityType::Title | EntityType::Number | EntityType::Other(_) => RiskCategory::Other,
        }
    }
}
