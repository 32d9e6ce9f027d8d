//! Event form models
//!
//! Fields are stored as a generic ordered list with a type discriminator and
//! open-ended options/validation payloads, so organizers can add, reorder or
//! retype fields without a migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventForm {
    pub id: i64,
    pub event_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormField {
    pub id: i64,
    pub form_id: i64,
    pub label: String,
    pub field_type: String,
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Option<serde_json::Value>,
    pub validation: Option<serde_json::Value>,
    pub field_order: i32,
}

/// Organizer-supplied field definition used when replacing a form's field list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub label: String,
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    pub validation: Option<ValidationRules>,
    pub order: i32,
}

/// Per-field validation parameters, stored as an open JSON object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormResponse {
    pub id: i64,
    pub registration_id: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FieldResponse {
    pub id: i64,
    pub response_id: i64,
    pub field_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Email,
    Phone,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    Time,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Email => "EMAIL",
            FieldType::Phone => "PHONE",
            FieldType::Number => "NUMBER",
            FieldType::Textarea => "TEXTAREA",
            FieldType::Select => "SELECT",
            FieldType::Radio => "RADIO",
            FieldType::Checkbox => "CHECKBOX",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TEXT" => Some(FieldType::Text),
            "EMAIL" => Some(FieldType::Email),
            "PHONE" => Some(FieldType::Phone),
            "NUMBER" => Some(FieldType::Number),
            "TEXTAREA" => Some(FieldType::Textarea),
            "SELECT" => Some(FieldType::Select),
            "RADIO" => Some(FieldType::Radio),
            "CHECKBOX" => Some(FieldType::Checkbox),
            "DATE" => Some(FieldType::Date),
            "TIME" => Some(FieldType::Time),
            _ => None,
        }
    }

    /// Choice types carry an options list the answer must belong to
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Radio | FieldType::Checkbox
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FormField {
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::parse(&self.field_type)
    }

    /// Normalize the stored options payload into a plain string list
    pub fn options_list(&self) -> Vec<String> {
        match &self.options {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Deserialize the stored validation payload, tolerating absence
    pub fn rules(&self) -> ValidationRules {
        self.validation
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_with(options: Option<serde_json::Value>, validation: Option<serde_json::Value>) -> FormField {
        FormField {
            id: 1,
            form_id: 1,
            label: "Shirt size".to_string(),
            field_type: "SELECT".to_string(),
            required: true,
            placeholder: None,
            options,
            validation,
            field_order: 0,
        }
    }

    #[test]
    fn test_options_list_normalization() {
        let field = field_with(Some(json!(["S", "M", "L"])), None);
        assert_eq!(field.options_list(), vec!["S", "M", "L"]);

        let field = field_with(None, None);
        assert!(field.options_list().is_empty());

        let field = field_with(Some(json!("not-an-array")), None);
        assert!(field.options_list().is_empty());
    }

    #[test]
    fn test_rules_tolerate_partial_payloads() {
        let field = field_with(None, Some(json!({ "min_length": 2 })));
        let rules = field.rules();
        assert_eq!(rules.min_length, Some(2));
        assert_eq!(rules.max_length, None);

        let field = field_with(None, None);
        assert!(field.rules().min.is_none());
    }

    #[test]
    fn test_field_type_round_trip() {
        for ty in [
            FieldType::Text,
            FieldType::Email,
            FieldType::Phone,
            FieldType::Number,
            FieldType::Textarea,
            FieldType::Select,
            FieldType::Radio,
            FieldType::Checkbox,
            FieldType::Date,
            FieldType::Time,
        ] {
            assert_eq!(FieldType::parse(ty.as_str()), Some(ty));
        }
    }
}
