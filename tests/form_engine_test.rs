//! Workflow-level tests for the dynamic form engine.

use std::collections::HashMap;

use serde_json::json;

use rollcall::models::form::{FieldType, FormField};
use rollcall::services::form::{render_default_value, validate_submission};

fn field(id: i64, label: &str, field_type: &str, required: bool) -> FormField {
    FormField {
        id,
        form_id: 1,
        label: label.to_string(),
        field_type: field_type.to_string(),
        required,
        placeholder: None,
        options: None,
        validation: None,
        field_order: id as i32,
    }
}

fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn empty_submission_reports_all_required_fields_not_just_the_first() {
    let fields = vec![
        field(1, "Full name", "TEXT", true),
        field(2, "Guest count", "NUMBER", true),
    ];

    let errors = validate_submission(&fields, &HashMap::new());

    // both fields reported in one round trip
    assert_eq!(errors.len(), 2);
    assert!(errors["1"][0].contains("required"));
    assert!(errors["2"][0].contains("required"));
}

#[test]
fn a_complete_valid_submission_passes_every_type() {
    let mut select = field(5, "Shirt size", "SELECT", true);
    select.options = Some(json!(["S", "M", "L"]));
    let mut checkbox = field(6, "Topics", "CHECKBOX", false);
    checkbox.options = Some(json!(["rust", "sql"]));

    let fields = vec![
        field(1, "Full name", "TEXT", true),
        field(2, "Work email", "EMAIL", true),
        field(3, "Phone", "PHONE", false),
        field(4, "Guests", "NUMBER", true),
        select,
        checkbox,
        field(7, "Arrival date", "DATE", true),
        field(8, "Arrival time", "TIME", false),
        field(9, "Notes", "TEXTAREA", false),
    ];

    let submission = answers(&[
        ("1", "Ada Lovelace"),
        ("2", "ada@example.com"),
        ("3", "+44 20 7946 0958"),
        ("4", "2"),
        ("5", "M"),
        ("6", "rust, sql"),
        ("7", "2025-09-12"),
        ("8", "09:30"),
        ("9", "Vegetarian"),
    ]);

    let errors = validate_submission(&fields, &submission);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn every_invalid_field_is_reported_together() {
    let mut number = field(2, "Guests", "NUMBER", true);
    number.validation = Some(json!({ "min": 1.0, "max": 4.0 }));
    let mut select = field(3, "Shirt size", "SELECT", true);
    select.options = Some(json!(["S", "M"]));

    let fields = vec![field(1, "Work email", "EMAIL", true), number, select];

    let submission = answers(&[("1", "nope"), ("2", "40"), ("3", "XXL")]);
    let errors = validate_submission(&fields, &submission);

    assert_eq!(errors.len(), 3);
}

#[test]
fn validation_rules_are_read_from_the_open_payload() {
    let mut text = field(1, "Nickname", "TEXT", true);
    text.validation = Some(json!({ "min_length": 3, "max_length": 8 }));

    let short = validate_submission(std::slice::from_ref(&text), &answers(&[("1", "ab")]));
    assert!(short["1"][0].contains("at least 3"));

    let long = validate_submission(
        std::slice::from_ref(&text),
        &answers(&[("1", "far-too-long-name")]),
    );
    assert!(long["1"][0].contains("at most 8"));

    let fine = validate_submission(&[text], &answers(&[("1", "goldi")]));
    assert!(fine.is_empty());
}

#[test]
fn malformed_dates_and_times_are_rejected() {
    let fields = vec![
        field(1, "Arrival date", "DATE", true),
        field(2, "Arrival time", "TIME", true),
    ];

    let bad = answers(&[("1", "12/09/2025"), ("2", "quarter past nine")]);
    assert_eq!(validate_submission(&fields, &bad).len(), 2);

    let good = answers(&[("1", "2025-09-12"), ("2", "21:15")]);
    assert!(validate_submission(&fields, &good).is_empty());
}

#[test]
fn stored_answers_render_back_as_typed_defaults() {
    let number = field(1, "Guests", "NUMBER", false);
    assert_eq!(render_default_value(&number, Some("2")), json!(2.0));

    let date = field(2, "Arrival", "DATE", false);
    assert_eq!(
        render_default_value(&date, Some("2025-09-12")),
        json!("2025-09-12")
    );

    let mut checkbox = field(3, "Topics", "CHECKBOX", false);
    checkbox.options = Some(json!(["rust", "sql"]));
    assert_eq!(
        render_default_value(&checkbox, Some("rust,sql")),
        json!(["rust", "sql"])
    );

    let text = field(4, "Name", "TEXT", false);
    assert_eq!(render_default_value(&text, Some("Ada")), json!("Ada"));
    assert_eq!(render_default_value(&text, None), json!(null));
}

#[test]
fn choice_types_require_an_options_payload() {
    assert!(FieldType::Select.is_choice());
    assert!(FieldType::Radio.is_choice());
    assert!(FieldType::Checkbox.is_choice());
    assert!(!FieldType::Text.is_choice());

    // a SELECT with no options rejects every non-empty answer
    let select = field(1, "Broken", "SELECT", true);
    let errors = validate_submission(&[select], &answers(&[("1", "anything")]));
    assert_eq!(errors.len(), 1);
}
