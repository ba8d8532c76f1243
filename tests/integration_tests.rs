//! Integration tests for the complete quoteform pipeline
//!
//! These tests compile the shipped knowledge base under `ontology/`:
//! - sources → statement blocks → declarations
//! - declarations → sections → compiled schema
//! - compiled schema → publisher → validation
//!
//! Run with: cargo test --test integration_tests

use std::path::{Path, PathBuf};

use quoteform_ontology::{CombinedSource, SourceError};
use quoteform_schema::{
    validate_submission, ClassRule, CompileError, CompileOutcome, Compiler, CompilerConfig,
    ControlType, SchemaPublisher, SectionId, Submission, ValidationCode, DEFAULT_DOCUMENTS,
};

fn ontology_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("ontology")
}

fn shipped_config() -> CompilerConfig {
    CompilerConfig {
        ontology_dir: ontology_dir(),
        ..CompilerConfig::default()
    }
}

fn compile_shipped() -> CompileOutcome {
    Compiler::from_config(&shipped_config())
        .expect("shipped config is valid")
        .compile()
        .expect("shipped ontology compiles")
}

fn field_ids(outcome: &CompileOutcome, section: SectionId) -> Vec<&str> {
    outcome
        .schema
        .section(section)
        .expect("every section is present")
        .fields
        .iter()
        .map(|f| f.id.as_str())
        .collect()
}

// ============================================================================
// Shipped knowledge base
// ============================================================================

#[test]
fn test_shipped_ontology_compiles_without_diagnostics() {
    let outcome = compile_shipped();

    assert!(
        outcome.diagnostics.is_empty(),
        "unexpected diagnostics: {:#?}",
        outcome.diagnostics
    );
    assert_eq!(outcome.documents.len(), DEFAULT_DOCUMENTS.len());
    assert_eq!(outcome.schema.field_count(), 32);

    let counts: Vec<(SectionId, usize)> = outcome
        .schema
        .sections
        .values()
        .map(|s| (s.id, s.fields.len()))
        .collect();
    assert_eq!(
        counts,
        vec![
            (SectionId::Drivers, 9),
            (SectionId::Vehicles, 9),
            (SectionId::Claims, 6),
            (SectionId::Settings, 5),
            (SectionId::Documents, 3),
        ]
    );
}

#[test]
fn test_fields_keep_declaration_order() {
    let outcome = compile_shipped();
    assert_eq!(
        field_ids(&outcome, SectionId::Drivers),
        vec![
            "firstName",
            "lastName",
            "dateOfBirth",
            "email",
            "mobilePhone",
            "hasLicense",
            "licenceType",
            "yearsLicensed",
            "relationshipToMainDriver",
        ]
    );
    assert_eq!(
        field_ids(&outcome, SectionId::Documents),
        vec!["documentType", "documentIssueDate", "documentNotes"]
    );
}

#[test]
fn test_object_properties_are_not_fields() {
    let outcome = compile_shipped();
    assert!(outcome.schema.fields().all(|f| f.id != "drives"));
}

#[test]
fn test_inferred_controls() {
    let outcome = compile_shipped();
    let control = |section: SectionId, id: &str| {
        outcome
            .schema
            .field(section, id)
            .unwrap_or_else(|| panic!("missing field {id}"))
            .control
    };

    assert_eq!(control(SectionId::Drivers, "firstName"), ControlType::Text);
    assert_eq!(control(SectionId::Drivers, "dateOfBirth"), ControlType::Date);
    assert_eq!(control(SectionId::Drivers, "email"), ControlType::Email);
    // The shipped documents declare `formType "tel"` on both phone fields.
    assert_eq!(control(SectionId::Drivers, "mobilePhone"), ControlType::Tel);
    assert_eq!(control(SectionId::Drivers, "hasLicense"), ControlType::Radio);
    assert_eq!(control(SectionId::Drivers, "licenceType"), ControlType::Select);
    assert_eq!(control(SectionId::Drivers, "yearsLicensed"), ControlType::Text);

    assert_eq!(control(SectionId::Vehicles, "coverType"), ControlType::Radio);
    assert_eq!(control(SectionId::Vehicles, "overnightParking"), ControlType::Select);
    assert_eq!(control(SectionId::Vehicles, "isModified"), ControlType::Radio);
    assert_eq!(control(SectionId::Vehicles, "modificationDetails"), ControlType::Textarea);

    assert_eq!(control(SectionId::Claims, "claimType"), ControlType::Select);
    assert_eq!(control(SectionId::Claims, "atFault"), ControlType::Radio);

    assert_eq!(control(SectionId::Settings, "preferredContactMethod"), ControlType::Radio);
    assert_eq!(control(SectionId::Settings, "contactPhone"), ControlType::Tel);
    assert_eq!(control(SectionId::Settings, "language"), ControlType::Radio);

    assert_eq!(control(SectionId::Documents, "documentType"), ControlType::Select);
    assert_eq!(control(SectionId::Documents, "documentNotes"), ControlType::Textarea);
}

#[test]
fn test_extension_attributes_survive() {
    let outcome = compile_shipped();

    let licence = outcome.schema.field(SectionId::Drivers, "licenceType").unwrap();
    assert!(licence.required);
    assert_eq!(licence.conditional_display.as_deref(), Some("hasLicense == true"));
    let values: Vec<&str> = licence.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["Full UK", "Provisional", "EU", "International"]);

    let cover = outcome.schema.field(SectionId::Vehicles, "coverType").unwrap();
    assert_eq!(cover.options[1].value, "Third party, fire and theft");

    let mileage = outcome.schema.field(SectionId::Vehicles, "annualMileage").unwrap();
    assert_eq!(mileage.default_value.as_deref(), Some("8000"));

    let code = outcome.schema.field(SectionId::Claims, "convictionCode").unwrap();
    assert_eq!(code.validation_pattern.as_deref(), Some("[A-Z]{2}[0-9]{2}"));

    let opt_in = outcome.schema.field(SectionId::Settings, "marketingOptIn").unwrap();
    assert!(!opt_in.required);

    let first = outcome.schema.field(SectionId::Drivers, "firstName").unwrap();
    assert_eq!(first.source.document, "AI_Driver_Details.ttl");
    assert_eq!(first.source.line, 22);
}

#[test]
fn test_compile_is_deterministic() {
    let a = compile_shipped();
    let b = compile_shipped();
    assert_eq!(a.schema, b.schema);
    assert_eq!(a.schema.fingerprint, b.schema.fingerprint);
    assert!(a.schema.fingerprint.starts_with("fnv1a64:"));
    assert_eq!(
        serde_json::to_string(&a.schema).unwrap(),
        serde_json::to_string(&b.schema).unwrap()
    );
}

#[test]
fn test_schema_json_shape() {
    let outcome = compile_shipped();
    let json = serde_json::to_value(&outcome.schema).unwrap();

    let keys: Vec<&String> = json["sections"].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 5);

    let has_license = &json["sections"]["drivers"]["fields"][5];
    assert_eq!(has_license["id"], "hasLicense");
    assert_eq!(has_license["type"], "radio");
    assert_eq!(has_license["required"], true);
    assert_eq!(json["sections"]["vehicles"]["title"], "Vehicle Details");
    assert_eq!(json["sections"]["documents"]["order"], 5);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_missing_document_fails_the_compile() {
    let mut config = shipped_config();
    config.documents.push(PathBuf::from("AI_Missing.ttl"));
    let compiler = Compiler::from_config(&config).unwrap();

    match compiler.compile() {
        Err(CompileError::Source(SourceError::Read { path, .. })) => {
            assert!(path.ends_with("AI_Missing.ttl"));
        }
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[test]
fn test_document_order_changes_field_order_not_content() {
    let mut config = shipped_config();
    config.documents.reverse();
    let reversed = Compiler::from_config(&config).unwrap().compile().unwrap();
    let forward = compile_shipped();

    assert_eq!(reversed.schema.field_count(), forward.schema.field_count());
    assert_eq!(
        field_ids(&reversed, SectionId::Drivers),
        field_ids(&forward, SectionId::Drivers)
    );
    assert_eq!(reversed.documents[0].path, forward.documents[4].path);
}

#[test]
fn test_extra_class_places_field_in_two_sections() {
    let mut config = shipped_config();
    config.extra_classes.push(ClassRule::new(
        "PersonalDocument",
        [SectionId::Drivers],
    ));
    let outcome = Compiler::from_config(&config).unwrap().compile().unwrap();

    assert!(outcome.schema.field(SectionId::Documents, "documentIssueDate").is_some());
    let mirrored = outcome
        .schema
        .field(SectionId::Drivers, "documentIssueDate")
        .expect("copy in drivers");
    assert_eq!(mirrored.section, SectionId::Drivers);
    assert_eq!(outcome.schema.field_count(), 33);
}

#[test]
fn test_trailing_unterminated_statement_is_reported() {
    let compiler = Compiler::from_config(&shipped_config()).unwrap();
    let source = CombinedSource::from_documents([(
        "tail.ttl",
        "autoins:policyStart a owl:DatatypeProperty ;\n    rdfs:domain autoins:Driver ;\n    rdfs:label \"Policy start\"",
    )]);
    let outcome = compiler.compile_source(&source).unwrap();

    assert_eq!(outcome.schema.field_count(), 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind(), "truncated_block");
}

// ============================================================================
// Publisher + validation
// ============================================================================

#[test]
fn test_publisher_serves_validating_schema() {
    let publisher = SchemaPublisher::new(Compiler::from_config(&shipped_config()).unwrap());
    let published = publisher.reload().unwrap();
    assert_eq!(published.version, 1);
    assert!(!publisher.sources_changed().unwrap());

    let submission: Submission = serde_json::from_value(serde_json::json!({
        "section": "drivers",
        "fields": {
            "firstName": "Ada",
            "dateOfBirth": "1990-02-30",
            "hasLicense": true,
            "licenceType": "Learner",
        }
    }))
    .unwrap();
    let report = validate_submission(&publisher.current().schema, &submission);

    let codes: Vec<(&str, ValidationCode)> = report
        .errors
        .iter()
        .map(|e| (e.field.as_str(), e.code))
        .collect();
    assert!(!report.valid);
    assert!(codes.contains(&("dateOfBirth", ValidationCode::InvalidType)));
    assert!(codes.contains(&("licenceType", ValidationCode::NotAnOption)));
    assert!(!codes.iter().any(|(f, _)| *f == "yearsLicensed"));
}
