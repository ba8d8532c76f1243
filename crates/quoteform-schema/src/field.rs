//! Schema data model: controls, fields, sections and the compiled schema.

use quoteform_ontology::{SourceLocation, ValueRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// UI control used to render a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Text,
    Email,
    Tel,
    Date,
    Radio,
    Select,
    Textarea,
}

impl ControlType {
    pub const ALL: [ControlType; 7] = [
        ControlType::Text,
        ControlType::Email,
        ControlType::Tel,
        ControlType::Date,
        ControlType::Radio,
        ControlType::Select,
        ControlType::Textarea,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlType::Text => "text",
            ControlType::Email => "email",
            ControlType::Tel => "tel",
            ControlType::Date => "date",
            ControlType::Radio => "radio",
            ControlType::Select => "select",
            ControlType::Textarea => "textarea",
        }
    }

    /// Controls that restrict the value to the declared options.
    pub fn is_choice(self) -> bool {
        matches!(self, ControlType::Radio | ControlType::Select)
    }
}

impl std::fmt::Display for ControlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown control type `{0}`")]
pub struct UnknownControlType(pub String);

impl FromStr for ControlType {
    type Err = UnknownControlType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ControlType::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownControlType(wanted.to_string()))
    }
}

/// Fixed set of form sections, in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Drivers,
    Vehicles,
    Claims,
    Settings,
    Documents,
}

impl SectionId {
    pub const ALL: [SectionId; 5] = [
        SectionId::Drivers,
        SectionId::Vehicles,
        SectionId::Claims,
        SectionId::Settings,
        SectionId::Documents,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionId::Drivers => "drivers",
            SectionId::Vehicles => "vehicles",
            SectionId::Claims => "claims",
            SectionId::Settings => "settings",
            SectionId::Documents => "documents",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionId::Drivers => "Driver Details",
            SectionId::Vehicles => "Vehicle Details",
            SectionId::Claims => "Claims History",
            SectionId::Settings => "Application Settings",
            SectionId::Documents => "Documents",
        }
    }

    /// 1-based display position.
    pub fn order(self) -> u32 {
        match self {
            SectionId::Drivers => 1,
            SectionId::Vehicles => 2,
            SectionId::Claims => 3,
            SectionId::Settings => 4,
            SectionId::Documents => 5,
        }
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section `{0}` (expected one of drivers, vehicles, claims, settings, documents)")]
pub struct UnknownSection(pub String);

impl FromStr for SectionId {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSection(wanted.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    /// Options declared in the ontology use the value as their label.
    pub fn from_value(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub control: ControlType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub options: Vec<FieldOption>,
    pub section: SectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_display: Option<String>,
    pub value_type: ValueRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSchema {
    pub id: SectionId,
    pub title: String,
    pub order: u32,
    pub fields: Vec<FieldSchema>,
}

impl SectionSchema {
    pub fn empty(id: SectionId, title: impl Into<String>, order: u32) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// Every section of the form, keyed and ordered by [`SectionId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledSchema {
    pub sections: BTreeMap<SectionId, SectionSchema>,
    /// Digest of the canonical JSON of `sections`.
    pub fingerprint: String,
}

impl CompiledSchema {
    /// All sections present with no fields.
    pub fn empty() -> Self {
        let sections: BTreeMap<SectionId, SectionSchema> = SectionId::ALL
            .into_iter()
            .map(|id| (id, SectionSchema::empty(id, id.title(), id.order())))
            .collect();
        let fingerprint = sections_fingerprint(&sections).unwrap_or_default();
        Self {
            sections,
            fingerprint,
        }
    }

    pub fn section(&self, id: SectionId) -> Option<&SectionSchema> {
        self.sections.get(&id)
    }

    pub fn field(&self, section: SectionId, id: &str) -> Option<&FieldSchema> {
        self.section(section).and_then(|s| s.field(id))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.sections.values().flat_map(|s| s.fields.iter())
    }

    pub fn field_count(&self) -> usize {
        self.sections.values().map(|s| s.fields.len()).sum()
    }
}

/// Fingerprint of a section map: FNV-1a 64 over its canonical JSON.
///
/// `BTreeMap` keys and struct field order make the JSON canonical.
pub fn sections_fingerprint(
    sections: &BTreeMap<SectionId, SectionSchema>,
) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(sections)?;
    Ok(quoteform_ontology::digest::fnv1a64_digest_bytes(&bytes))
}
