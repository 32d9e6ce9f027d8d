//! Dynamic form engine
//!
//! Organizers define an ordered, typed set of fields per event; attendee
//! submissions are validated against that definition field by field. Every
//! field is checked — the caller gets the complete error set in one round
//! trip, keyed by field id.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};

use crate::database::service::DatabaseService;
use crate::models::event::Event;
use crate::models::form::{FieldDefinition, FieldType, FormField};
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::utils::errors::{FieldErrors, Result, RollcallError};
use crate::utils::helpers::{is_valid_email, is_valid_phone};

/// Form engine service
#[derive(Clone)]
pub struct FormService {
    db: DatabaseService,
    auth: AuthService,
}

impl FormService {
    /// Create a new FormService instance
    pub fn new(db: DatabaseService, auth: AuthService) -> Self {
        Self { db, auth }
    }

    /// Replace an event's field list, preserving the given order
    pub async fn define_fields(
        &self,
        caller: &User,
        event_id: i64,
        fields: Vec<FieldDefinition>,
    ) -> Result<Vec<FormField>> {
        let event = self.db.require_event(event_id).await?;
        self.auth.require_event_manager(caller, &event)?;

        for definition in &fields {
            let Some(field_type) = FieldType::parse(&definition.field_type) else {
                return Err(RollcallError::InvalidInput(format!(
                    "Unknown field type: {}",
                    definition.field_type
                )));
            };
            if field_type.is_choice()
                && definition
                    .options
                    .as_ref()
                    .map(|o| o.is_empty())
                    .unwrap_or(true)
            {
                return Err(RollcallError::InvalidInput(format!(
                    "Field \"{}\" needs at least one option",
                    definition.label
                )));
            }
        }

        let stored = self.db.forms.replace_fields(event_id, fields).await?;
        info!(
            event_id = event_id,
            field_count = stored.len(),
            user_id = caller.id,
            "Event form fields replaced"
        );

        Ok(stored)
    }

    /// Ordered field list for an event
    pub async fn fields_for_event(&self, event_id: i64) -> Result<Vec<FormField>> {
        self.db.forms.list_fields(event_id).await
    }

    /// Activate or deactivate an event's form
    pub async fn set_form_active(
        &self,
        caller: &User,
        event_id: i64,
        is_active: bool,
    ) -> Result<()> {
        let event = self.db.require_event(event_id).await?;
        self.auth.require_event_manager(caller, &event)?;
        self.db.forms.set_active(event_id, is_active).await
    }

    /// Validate a submission against the active form and map answers to
    /// (field id, value) pairs ready for persistence.
    ///
    /// Events without an active form accept any submission as empty.
    pub async fn prepare_answers(
        &self,
        event: &Event,
        answers: &HashMap<String, String>,
    ) -> Result<Vec<(i64, String)>> {
        let form = self.db.forms.find_by_event(event.id).await?;
        if !form.map(|f| f.is_active).unwrap_or(false) {
            return Ok(Vec::new());
        }

        let fields = self.db.forms.list_fields(event.id).await?;
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let errors = validate_submission(&fields, answers);
        if !errors.is_empty() {
            debug!(event_id = event.id, error_count = errors.len(), "Form submission rejected");
            return Err(RollcallError::Validation(errors));
        }

        Ok(collect_answers(&fields, answers))
    }

    /// Stored answers for a registration, mapped back to typed defaults for
    /// re-display
    pub async fn response_defaults(
        &self,
        event_id: i64,
        registration_id: i64,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let fields = self.db.forms.list_fields(event_id).await?;
        let response = self.db.forms.find_response(registration_id).await?;

        let stored: HashMap<i64, String> = response
            .map(|(_, answers)| {
                answers
                    .into_iter()
                    .map(|a| (a.field_id, a.value))
                    .collect()
            })
            .unwrap_or_default();

        Ok(fields
            .iter()
            .map(|field| {
                let existing = stored.get(&field.id).map(|s| s.as_str());
                (
                    field.id.to_string(),
                    render_default_value(field, existing),
                )
            })
            .collect())
    }
}

/// Validate every field of a submission, collecting the complete error set.
///
/// Answers are keyed by field id. Fields are checked in their defined order;
/// validation is never fail-fast.
pub fn validate_submission(
    fields: &[FormField],
    answers: &HashMap<String, String>,
) -> FieldErrors {
    let mut errors: FieldErrors = HashMap::new();

    for field in fields {
        let key = field.id.to_string();
        let value = answers.get(&key).map(|s| s.trim()).unwrap_or("");
        let mut messages = Vec::new();

        if value.is_empty() {
            if field.required {
                messages.push(format!("{} is required", field.label));
            }
            if !messages.is_empty() {
                errors.insert(key, messages);
            }
            continue;
        }

        let rules = field.rules();
        match field.field_type() {
            Some(FieldType::Text) | Some(FieldType::Textarea) => {
                check_length(value, &rules, &field.label, &mut messages);
            }
            Some(FieldType::Email) => {
                if !is_valid_email(value) {
                    messages.push(format!("{} must be a valid email address", field.label));
                }
            }
            Some(FieldType::Phone) => {
                if !is_valid_phone(value) {
                    messages.push(format!("{} must be a valid phone number", field.label));
                }
            }
            Some(FieldType::Number) => match value.parse::<f64>() {
                Ok(number) => {
                    if let Some(min) = rules.min {
                        if number < min {
                            messages.push(format!("{} must be at least {}", field.label, min));
                        }
                    }
                    if let Some(max) = rules.max {
                        if number > max {
                            messages.push(format!("{} must be at most {}", field.label, max));
                        }
                    }
                }
                Err(_) => messages.push(format!("{} must be a number", field.label)),
            },
            Some(FieldType::Date) => {
                if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                    messages.push(format!("{} must be a date (YYYY-MM-DD)", field.label));
                }
            }
            Some(FieldType::Time) => {
                let well_formed = NaiveTime::parse_from_str(value, "%H:%M").is_ok()
                    || NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok();
                if !well_formed {
                    messages.push(format!("{} must be a time (HH:MM)", field.label));
                }
            }
            Some(FieldType::Select) | Some(FieldType::Radio) => {
                let options = field.options_list();
                if !options.iter().any(|o| o == value) {
                    messages.push(format!("{} must be one of the offered options", field.label));
                }
            }
            Some(FieldType::Checkbox) => {
                let options = field.options_list();
                for item in split_checkbox_values(value) {
                    if !options.iter().any(|o| *o == item) {
                        messages.push(format!(
                            "{}: \"{}\" is not an offered option",
                            field.label, item
                        ));
                    }
                }
            }
            None => {
                messages.push(format!("{} has an unknown field type", field.label));
            }
        }

        if !messages.is_empty() {
            errors.insert(key, messages);
        }
    }

    errors
}

/// Map a previously stored answer back into the typed representation used
/// for re-display
pub fn render_default_value(field: &FormField, existing: Option<&str>) -> serde_json::Value {
    let Some(value) = existing else {
        return serde_json::Value::Null;
    };

    match field.field_type() {
        Some(FieldType::Number) => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(FieldType::Date) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        Some(FieldType::Checkbox) => serde_json::Value::Array(
            split_checkbox_values(value)
                .into_iter()
                .map(serde_json::Value::String)
                .collect(),
        ),
        _ => serde_json::Value::String(value.to_string()),
    }
}

/// Collect present answers as (field id, value) pairs in field order
fn collect_answers(fields: &[FormField], answers: &HashMap<String, String>) -> Vec<(i64, String)> {
    fields
        .iter()
        .filter_map(|field| {
            answers
                .get(&field.id.to_string())
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| (field.id, v.to_string()))
        })
        .collect()
}

/// Checkbox answers arrive either as a JSON array or a comma-delimited string
fn split_checkbox_values(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(trimmed) {
            return items
                .into_iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect();
        }
    }

    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn check_length(value: &str, rules: &crate::models::form::ValidationRules, label: &str, messages: &mut Vec<String>) {
    let length = value.chars().count();
    if let Some(min) = rules.min_length {
        if length < min {
            messages.push(format!("{} must be at least {} characters", label, min));
        }
    }
    if let Some(max) = rules.max_length {
        if length > max {
            messages.push(format!("{} must be at most {} characters", label, max));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

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

    #[test]
    fn test_empty_submission_reports_every_required_field() {
        let fields = vec![
            field(1, "Full name", "TEXT", true),
            field(2, "Guests", "NUMBER", true),
        ];

        let errors = validate_submission(&fields, &HashMap::new());
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("1"));
        assert!(errors.contains_key("2"));
    }

    #[test]
    fn test_optional_empty_fields_pass() {
        let fields = vec![field(1, "Company", "TEXT", false)];
        let errors = validate_submission(&fields, &HashMap::new());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_number_bounds() {
        let mut f = field(1, "Guests", "NUMBER", true);
        f.validation = Some(json!({ "min": 1.0, "max": 5.0 }));

        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "7".to_string());
        let errors = validate_submission(&[f.clone()], &answers);
        assert_eq!(errors.get("1").map(|m| m.len()), Some(1));

        answers.insert("1".to_string(), "3".to_string());
        assert!(validate_submission(&[f.clone()], &answers).is_empty());

        answers.insert("1".to_string(), "many".to_string());
        assert!(!validate_submission(&[f], &answers).is_empty());
    }

    #[test]
    fn test_text_length_rules() {
        let mut f = field(1, "Nickname", "TEXT", true);
        f.validation = Some(json!({ "min_length": 2, "max_length": 4 }));

        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "a".to_string());
        assert!(!validate_submission(std::slice::from_ref(&f), &answers).is_empty());

        answers.insert("1".to_string(), "abcde".to_string());
        assert!(!validate_submission(std::slice::from_ref(&f), &answers).is_empty());

        answers.insert("1".to_string(), "abc".to_string());
        assert!(validate_submission(&[f], &answers).is_empty());
    }

    #[test]
    fn test_choice_membership() {
        let mut f = field(1, "Shirt size", "SELECT", true);
        f.options = Some(json!(["S", "M", "L"]));

        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "XL".to_string());
        assert!(!validate_submission(std::slice::from_ref(&f), &answers).is_empty());

        answers.insert("1".to_string(), "M".to_string());
        assert!(validate_submission(&[f], &answers).is_empty());
    }

    #[test]
    fn test_checkbox_accepts_subset_of_options() {
        let mut f = field(1, "Interests", "CHECKBOX", false);
        f.options = Some(json!(["rust", "go", "zig"]));

        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "rust, zig".to_string());
        assert!(validate_submission(std::slice::from_ref(&f), &answers).is_empty());

        answers.insert("1".to_string(), "rust, java".to_string());
        assert!(!validate_submission(&[f], &answers).is_empty());
    }

    #[test]
    fn test_date_and_time_well_formedness() {
        let date = field(1, "Arrival date", "DATE", true);
        let time = field(2, "Arrival time", "TIME", true);

        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "2025-06-01".to_string());
        answers.insert("2".to_string(), "18:30".to_string());
        assert!(validate_submission(&[date.clone(), time.clone()], &answers).is_empty());

        answers.insert("1".to_string(), "June 1st".to_string());
        answers.insert("2".to_string(), "evening".to_string());
        let errors = validate_submission(&[date, time], &answers);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_email_and_phone_shapes() {
        let email = field(1, "Work email", "EMAIL", true);
        let phone = field(2, "Phone", "PHONE", true);

        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "me@company.com".to_string());
        answers.insert("2".to_string(), "+1 555 123 4567".to_string());
        assert!(validate_submission(&[email.clone(), phone.clone()], &answers).is_empty());

        answers.insert("1".to_string(), "not-an-email".to_string());
        answers.insert("2".to_string(), "call me maybe".to_string());
        assert_eq!(validate_submission(&[email, phone], &answers).len(), 2);
    }

    #[test]
    fn test_render_default_value_typed_mapping() {
        let number = field(1, "Guests", "NUMBER", false);
        assert_eq!(render_default_value(&number, Some("3")), json!(3.0));
        assert_eq!(render_default_value(&number, Some("nope")), json!(null));
        assert_eq!(render_default_value(&number, None), json!(null));

        let date = field(2, "Arrival", "DATE", false);
        assert_eq!(
            render_default_value(&date, Some("2025-06-01")),
            json!("2025-06-01")
        );

        let checkbox = field(3, "Interests", "CHECKBOX", false);
        assert_eq!(
            render_default_value(&checkbox, Some("rust, go")),
            json!(["rust", "go"])
        );
        assert_eq!(
            render_default_value(&checkbox, Some("[\"rust\",\"go\"]")),
            json!(["rust", "go"])
        );

        let text = field(4, "Name", "TEXT", false);
        assert_eq!(render_default_value(&text, Some("Ada")), json!("Ada"));
    }

    #[test]
    fn test_collect_answers_keeps_field_order() {
        let fields = vec![
            field(2, "Second", "TEXT", false),
            field(1, "First", "TEXT", false),
        ];
        let mut answers = HashMap::new();
        answers.insert("1".to_string(), "one".to_string());
        answers.insert("2".to_string(), "two".to_string());

        let collected = collect_answers(&fields, &answers);
        assert_eq!(collected, vec![(2, "two".to_string()), (1, "one".to_string())]);
    }
}
