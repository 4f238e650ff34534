//! BIO entity labels.
//!
//! Labels arrive from the token classifier either as `B-PER` style pairs or in
//! the classifier's raw `PER_B` form. Both are parsed into [`EntityLabel`];
//! anything else is kept verbatim as [`EntityLabel::Malformed`] so that it can
//! be reported but never blocks the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The sentinel label for tokens outside any entity.
pub const OUTSIDE_LABEL: &str = "O";

/// Position of a token within an entity span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelPosition {
    /// First token of an entity.
    Begin,
    /// Continuation token of an entity.
    Inside,
}

impl LabelPosition {
    /// Parses a single-letter position code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "B" | "b" => Some(Self::Begin),
            "I" | "i" => Some(Self::Inside),
            _ => None,
        }
    }

    /// Returns the single-letter position code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Begin => "B",
            Self::Inside => "I",
        }
    }
}

/// Entity types produced by the token classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    /// Person name.
    Person,
    /// Organization, usually a hospital or clinic.
    Organization,
    /// Location.
    Location,
    /// Date or time expression.
    Date,
    /// Disease or diagnosis.
    Disease,
    /// Phone number or other contact detail.
    Contact,
    /// Title or civil position.
    Title,
    /// Number or quantity.
    Number,
    /// Any type outside the known vocabulary.
    Other(String),
}

impl EntityType {
    /// Maps a type code to an entity type.
    ///
    /// Accepts both the canonical names (`PERSON`) and the short codes the
    /// classifier emits (`PER`, `ORG`, `LOC`, `CVL`, `NUM`).
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let upper = code.trim().to_uppercase();
        match upper.as_str() {
            "PER" | "PERSON" => Self::Person,
            "ORG" | "ORGANIZATION" => Self::Organization,
            "LOC" | "LOCATION" => Self::Location,
            "DATE" => Self::Date,
            "DISEASE" => Self::Disease,
            "CONTACT" => Self::Contact,
            "CVL" | "TITLE" => Self::Title,
            "NUM" | "NUMBER" => Self::Number,
            _ => Self::Other(upper),
        }
    }

    /// Returns the canonical type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::Date => "DATE",
            Self::Disease => "DISEASE",
            Self::Contact => "CONTACT",
            Self::Title => "TITLE",
            Self::Number => "NUMBER",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntityType {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<EntityType> for String {
    fn from(entity_type: EntityType) -> Self {
        entity_type.as_str().to_string()
    }
}

/// A parsed BIO entity label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityLabel {
    /// Not part of any entity.
    Outside,
    /// Token inside an entity of a known position and type.
    Tagged {
        /// Position within the entity span.
        position: LabelPosition,
        /// Entity type.
        entity_type: EntityType,
    },
    /// Label that could not be parsed; kept verbatim.
    Malformed(String),
}

impl EntityLabel {
    /// Creates a tagged label.
    #[must_use]
    pub fn tagged(position: LabelPosition, entity_type: EntityType) -> Self {
        Self::Tagged {
            position,
            entity_type,
        }
    }

    /// Creates a `B-` label for a type.
    #[must_use]
    pub fn begin(entity_type: EntityType) -> Self {
        Self::tagged(LabelPosition::Begin, entity_type)
    }

    /// Parses a raw label. Never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == OUTSIDE_LABEL {
            return Self::Outside;
        }

        // B-PER
        if let Some((pos, ty)) = raw.split_once('-') {
            if let Some(position) = LabelPosition::from_code(pos) {
                if !ty.is_empty() {
                    return Self::tagged(position, EntityType::from_code(ty));
                }
            }
        }

        // PER_B
        if let Some((ty, pos)) = raw.rsplit_once('_') {
            if let Some(position) = LabelPosition::from_code(pos) {
                if !ty.is_empty() {
                    return Self::tagged(position, EntityType::from_code(ty));
                }
            }
        }

        Self::Malformed(raw.to_string())
    }

    /// Returns true for the outside sentinel.
    #[must_use]
    pub fn is_outside(&self) -> bool {
        matches!(self, Self::Outside)
    }

    /// Returns the entity type with the position stripped.
    #[must_use]
    pub fn entity_type(&self) -> Option<&EntityType> {
        match self {
            Self::Tagged { entity_type, .. } => Some(entity_type),
            _ => None,
        }
    }

    /// Returns the bare type name used for placeholder lookup.
    ///
    /// Malformed labels yield their raw text so they fall through to the
    /// default placeholder.
    #[must_use]
    pub fn bare_type(&self) -> &str {
        match self {
            Self::Outside => OUTSIDE_LABEL,
            Self::Tagged { entity_type, .. } => entity_type.as_str(),
            Self::Malformed(raw) => raw,
        }
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outside => f.write_str(OUTSIDE_LABEL),
            Self::Tagged {
                position,
                entity_type,
            } => write!(f, "{}-{}", position.code(), entity_type),
            Self::Malformed(raw) => f.write_str(raw),
        }
    }
}

impl From<&str> for EntityLabel {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for EntityLabel {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<EntityLabel> for String {
    fn from(label: EntityLabel) -> Self {
        label.to_string()
    }
}
