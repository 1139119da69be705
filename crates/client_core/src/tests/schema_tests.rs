use super::*;
use serde::Deserialize;

fn payload(pairs: &[(&str, &str)]) -> RawPayload {
    pairs.iter().copied().collect()
}

#[test]
fn issue_path_joins_segments_or_falls_back_to_form() {
    let nested = ValidationIssue {
        path: vec!["address".into(), "city".into()],
        message: "bad".into(),
    };
    assert_eq!(nested.path_key(), "address.city");
    assert_eq!(ValidationIssue::form("x").path_key(), FORM_PATH);
    assert_eq!(ValidationIssue::at("title", "x").path_key(), "title");
}

#[test]
fn transforms_run_before_checks() {
    let schema = RecordSchema::new().with(field("title").trim().min_length(1, "required"));

    let output = schema
        .validate(&payload(&[("title", "  Buy milk  ")]))
        .expect("valid");
    assert_eq!(output.get("title").map(String::as_str), Some("Buy milk"));

    let issues = schema
        .validate(&payload(&[("title", "   ")]))
        .expect_err("blank after trim");
    assert_eq!(issues, vec![ValidationIssue::at("title", "required")]);
}

#[test]
fn issues_follow_field_order_and_stop_at_first_failure_per_field() {
    let schema = RecordSchema::new()
        .with(
            field("title")
                .min_length(1, "title required")
                .max_length(3, "title too long"),
        )
        .with(field("status").one_of(["open", "done"], "unknown status"));

    let issues = schema
        .validate(&payload(&[("title", ""), ("status", "archived")]))
        .expect_err("invalid");
    let keys: Vec<_> = issues.iter().map(ValidationIssue::path_key).collect();
    assert_eq!(keys, vec!["title", "status"]);
    assert_eq!(issues[0].message, "title required");
}

#[test]
fn undeclared_required_field_is_reported() {
    let schema = RecordSchema::new().with(field("title"));
    let issues = schema.validate(&RawPayload::default()).expect_err("missing");
    assert_eq!(issues[0].path_key(), "title");
    assert_eq!(issues[0].message, "title is required");
}

#[test]
fn optional_fields_are_omitted_when_absent_or_blank() {
    let schema = RecordSchema::new()
        .with(field("description").optional())
        .with(field("dueDate").omit_blank().rfc3339("bad date"));

    let output = schema
        .validate(&payload(&[("dueDate", "")]))
        .expect("valid");
    assert!(output.is_empty());

    let output = schema
        .validate(&payload(&[("dueDate", "  ")]))
        .expect("whitespace counts as blank");
    assert!(output.is_empty());

    let output = schema
        .validate(&payload(&[("description", ""), ("dueDate", "2026-01-01T00:00:00Z")]))
        .expect("valid");
    assert_eq!(output.get("description").map(String::as_str), Some(""));
    assert!(output.contains_key("dueDate"));

    let issues = schema
        .validate(&payload(&[("dueDate", "tomorrow")]))
        .expect_err("bad date");
    assert_eq!(issues, vec![ValidationIssue::at("dueDate", "bad date")]);
}

#[test]
fn custom_checks_receive_transformed_value() {
    let schema = RecordSchema::new().with(
        field("code")
            .trim()
            .check(|v| v.chars().all(|c| c.is_ascii_digit()), "digits only"),
    );
    assert!(schema.validate(&payload(&[("code", " 123 ")])).is_ok());
    assert!(schema.validate(&payload(&[("code", "12a")])).is_err());
}

#[derive(Debug, Deserialize, PartialEq)]
struct Contact {
    name: String,
    age: u32,
}

#[test]
fn typed_schema_reports_type_mismatch_at_form_path() {
    let schema: TypedSchema<Contact> =
        TypedSchema::new(RecordSchema::new().with(field("name").trim()).with(field("age")));

    // Typed records only see strings, so numeric fields surface as form-level issues.
    let issues = schema
        .validate(&payload(&[("name", " Ann "), ("age", "3")]))
        .expect_err("age is a string");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path_key(), FORM_PATH);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Note {
    title: String,
    #[serde(default)]
    body: Option<String>,
}

#[test]
fn typed_schema_surfaces_record_issues_unchanged() {
    let schema: TypedSchema<Note> = TypedSchema::new(
        RecordSchema::new()
            .with(field("title").trim().min_length(1, "needed"))
            .with(field("body").optional()),
    );

    let note = schema
        .validate(&payload(&[("title", " hi "), ("body", "")]))
        .expect("valid");
    assert_eq!(
        note,
        Note {
            title: "hi".into(),
            body: Some(String::new()),
        }
    );

    let issues = schema
        .validate(&payload(&[("title", "")]))
        .expect_err("invalid");
    assert_eq!(issues, vec![ValidationIssue::at("title", "needed")]);
}
