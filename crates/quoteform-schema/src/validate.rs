//! Server-side validation of a form submission against a compiled schema.
//!
//! Checks run in a fixed order and stop at the first failure per field:
//! unknown field, required, value type, option membership, email shape,
//! validation pattern. Fields with a conditional-display expression are never
//! required here, since only the UI can evaluate their visibility.

use crate::field::{CompiledSchema, ControlType, FieldSchema, SectionId};
use quoteform_ontology::ValueRange;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Request body of a validation call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Submission {
    pub section: SectionId,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    UnknownField,
    Required,
    InvalidType,
    NotAnOption,
    InvalidEmail,
    PatternMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is well-formed")
    })
}

pub fn validate_submission(schema: &CompiledSchema, submission: &Submission) -> ValidationReport {
    let section = schema.section(submission.section);

    let mut errors = Vec::new();
    for name in submission.fields.keys() {
        if section.and_then(|s| s.field(name)).is_none() {
            errors.push(FieldError {
                field: name.clone(),
                code: ValidationCode::UnknownField,
                message: format!("`{name}` is not a field of section {}", submission.section),
            });
        }
    }

    for field in section.map(|s| s.fields.as_slice()).unwrap_or_default() {
        if let Some(err) = check_field(field, submission.fields.get(&field.id)) {
            errors.push(err);
        }
    }

    ValidationReport::from_errors(errors)
}

fn check_field(field: &FieldSchema, value: Option<&Value>) -> Option<FieldError> {
    let fail = |code: ValidationCode, message: String| {
        Some(FieldError {
            field: field.id.clone(),
            code,
            message,
        })
    };

    let text = match value.map(scalar_text) {
        None | Some(Scalar::Empty) => {
            if field.required && field.conditional_display.is_none() {
                return fail(ValidationCode::Required, format!("{} is required", field.label));
            }
            return None;
        }
        Some(Scalar::Composite) => {
            return fail(
                ValidationCode::InvalidType,
                format!("{} must be a single value", field.label),
            )
        }
        Some(Scalar::Text(text)) => text,
    };
    let value = value?;

    if !matches_value_type(field.value_type, value, &text) {
        return fail(
            ValidationCode::InvalidType,
            format!("{} must be a {} value", field.label, field.value_type.as_str()),
        );
    }

    if field.control.is_choice()
        && !field.options.is_empty()
        && !field.options.iter().any(|o| o.value == text)
    {
        return fail(
            ValidationCode::NotAnOption,
            format!("`{text}` is not an option of {}", field.label),
        );
    }

    if field.control == ControlType::Email && !email_regex().is_match(&text) {
        return fail(
            ValidationCode::InvalidEmail,
            format!("{} must be an email address", field.label),
        );
    }

    if let Some(pattern) = &field.validation_pattern {
        // Patterns were checked at compile time; anchoring cannot break them.
        if let Ok(re) = Regex::new(&format!("^(?:{pattern})$")) {
            if !re.is_match(&text) {
                return fail(
                    ValidationCode::PatternMismatch,
                    format!("{} does not match the required format", field.label),
                );
            }
        }
    }

    None
}

enum Scalar {
    Empty,
    Composite,
    Text(String),
}

fn scalar_text(value: &Value) -> Scalar {
    match value {
        Value::Null => Scalar::Empty,
        Value::String(s) if s.trim().is_empty() => Scalar::Empty,
        Value::String(s) => Scalar::Text(s.trim().to_string()),
        Value::Bool(b) => Scalar::Text(b.to_string()),
        Value::Number(n) => Scalar::Text(n.to_string()),
        Value::Array(_) | Value::Object(_) => Scalar::Composite,
    }
}

fn matches_value_type(range: ValueRange, value: &Value, text: &str) -> bool {
    match range {
        ValueRange::String | ValueRange::Unspecified => true,
        ValueRange::Boolean => matches!(value, Value::Bool(_)) || text == "true" || text == "false",
        ValueRange::Date => {
            value.is_string() && chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        }
        ValueRange::Year => text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()),
        ValueRange::Decimal => {
            value.is_number() || text.parse::<f64>().map(f64::is_finite).unwrap_or(false)
        }
    }
}
