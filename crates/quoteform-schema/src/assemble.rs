//! Schema assembly: declarations in, sectioned schema out.

use crate::classify::ClassificationTable;
use crate::field::{
    sections_fingerprint, CompiledSchema, ControlType, FieldOption, FieldSchema, SectionSchema,
};
use crate::infer::infer_control;
use quoteform_ontology::{Diagnostic, Diagnostics, PropertyDeclaration, SourceLocation};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct SchemaAssembler {
    table: ClassificationTable,
}

impl SchemaAssembler {
    pub fn new(table: ClassificationTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    /// Group declarations into sections, in declaration order.
    ///
    /// A declaration is dropped, with a diagnostic, when it has no label, no
    /// owning class, an unclassified class, or an identifier already taken
    /// by an earlier kept declaration. Every section of the table is emitted.
    pub fn assemble(
        &self,
        declarations: Vec<PropertyDeclaration>,
        diagnostics: &mut Diagnostics,
    ) -> Result<CompiledSchema, serde_json::Error> {
        let mut sections: BTreeMap<_, SectionSchema> = self
            .table
            .section_ids()
            .filter_map(|id| {
                self.table
                    .section_meta(id)
                    .map(|meta| (id, SectionSchema::empty(id, meta.title.clone(), meta.order)))
            })
            .collect();
        let mut seen: HashMap<String, SourceLocation> = HashMap::new();

        for decl in declarations {
            let Some(label) = decl.label.clone().filter(|l| !l.trim().is_empty()) else {
                diagnostics.push(Diagnostic::MissingLabel {
                    property: decl.identifier,
                    location: decl.location,
                });
                continue;
            };
            let Some(class) = decl.domain.as_deref() else {
                diagnostics.push(Diagnostic::MissingDomain {
                    property: decl.identifier,
                    location: decl.location,
                });
                continue;
            };
            let Some(section_ids) = self.table.classify(class) else {
                diagnostics.push(Diagnostic::UnknownClass {
                    class: class.to_string(),
                    property: decl.identifier,
                    location: decl.location,
                });
                continue;
            };
            if let Some(first) = seen.get(&decl.identifier) {
                diagnostics.push(Diagnostic::DuplicateProperty {
                    first_declared_at: first.clone(),
                    property: decl.identifier,
                    location: decl.location,
                });
                continue;
            }
            seen.insert(decl.identifier.clone(), decl.location.clone());

            let control = resolve_control(&decl, diagnostics);
            for &section in section_ids {
                let field = FieldSchema {
                    id: decl.identifier.clone(),
                    label: label.clone(),
                    control,
                    required: decl.required,
                    help_text: decl.help_text.clone(),
                    options: decl
                        .enumeration
                        .iter()
                        .map(|v| FieldOption::from_value(v.as_str()))
                        .collect(),
                    section,
                    conditional_display: decl.conditional_display.clone(),
                    value_type: decl.range,
                    validation_pattern: decl.validation_pattern.clone(),
                    default_value: decl.default_value.clone(),
                    source: decl.location.clone(),
                };
                if let Some(target) = sections.get_mut(&section) {
                    target.fields.push(field);
                }
            }
        }

        let fingerprint = sections_fingerprint(&sections)?;
        tracing::debug!(
            fields = sections.values().map(|s| s.fields.len()).sum::<usize>(),
            %fingerprint,
            "assembled schema"
        );
        Ok(CompiledSchema {
            sections,
            fingerprint,
        })
    }
}

/// Inferred control, replaced by a valid `formType` override.
fn resolve_control(decl: &PropertyDeclaration, diagnostics: &mut Diagnostics) -> ControlType {
    let inferred = infer_control(decl.range, &decl.identifier, decl.enumeration.len());
    match decl.form_type.as_deref() {
        None => inferred,
        Some(name) => match name.parse::<ControlType>() {
            Ok(control) => control,
            Err(_) => {
                diagnostics.push(Diagnostic::UnknownFormType {
                    property: decl.identifier.clone(),
                    form_type: name.to_string(),
                    location: decl.location.clone(),
                });
                inferred
            }
        },
    }
}
