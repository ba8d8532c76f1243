//! Section classification: which form section(s) a class belongs to.
//!
//! The mapping is plain data. Classes absent from the table are not placed in
//! any section; the compiler drops their properties with a diagnostic.

use crate::field::SectionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One table row: a class and the sections its properties appear in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRule {
    pub class: String,
    pub sections: Vec<SectionId>,
}

impl ClassRule {
    pub fn new(class: impl Into<String>, sections: impl IntoIterator<Item = SectionId>) -> Self {
        Self {
            class: class.into(),
            sections: sections.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionMeta {
    pub title: String,
    pub order: u32,
}

const DEFAULT_RULES: &[(&str, SectionId)] = &[
    ("Driver", SectionId::Drivers),
    ("MainDriver", SectionId::Drivers),
    ("NamedDriver", SectionId::Drivers),
    ("Vehicle", SectionId::Vehicles),
    ("VehicleModification", SectionId::Vehicles),
    ("Claim", SectionId::Claims),
    ("Conviction", SectionId::Claims),
    ("ApplicationSettings", SectionId::Settings),
    ("UserPreferences", SectionId::Settings),
    ("Document", SectionId::Documents),
    ("PersonalDocument", SectionId::Documents),
    ("UserDocument", SectionId::Documents),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationTable {
    rules: Vec<ClassRule>,
    sections: BTreeMap<SectionId, SectionMeta>,
}

impl Default for ClassificationTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (class, section) in DEFAULT_RULES {
            table.add_rule(ClassRule::new(*class, [*section]));
        }
        table
    }
}

impl ClassificationTable {
    /// No class rules; section metadata only.
    pub fn empty() -> Self {
        let sections = SectionId::ALL
            .into_iter()
            .map(|id| {
                (
                    id,
                    SectionMeta {
                        title: id.title().to_string(),
                        order: id.order(),
                    },
                )
            })
            .collect();
        Self {
            rules: Vec::new(),
            sections,
        }
    }

    /// Add a row, or extend the existing row for the same class. Sections
    /// already listed for the class are not repeated.
    pub fn add_rule(&mut self, rule: ClassRule) {
        match self.rules.iter_mut().find(|r| r.class == rule.class) {
            Some(existing) => {
                for section in rule.sections {
                    if !existing.sections.contains(&section) {
                        existing.sections.push(section);
                    }
                }
            }
            None => {
                let mut sections = Vec::with_capacity(rule.sections.len());
                for section in rule.sections {
                    if !sections.contains(&section) {
                        sections.push(section);
                    }
                }
                self.rules.push(ClassRule {
                    class: rule.class,
                    sections,
                });
            }
        }
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = ClassRule>) -> Self {
        for rule in rules {
            self.add_rule(rule);
        }
        self
    }

    /// Sections for `class`, or `None` when the class is not classified.
    pub fn classify(&self, class: &str) -> Option<&[SectionId]> {
        self.rules
            .iter()
            .find(|r| r.class == class)
            .map(|r| r.sections.as_slice())
            .filter(|s| !s.is_empty())
    }

    pub fn rules(&self) -> &[ClassRule] {
        &self.rules
    }

    pub fn section_ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.keys().copied()
    }

    pub fn section_meta(&self, id: SectionId) -> Option<&SectionMeta> {
        self.sections.get(&id)
    }
}
