//! Dynamic form field model
//!
//! Each category carries an admin-defined list of fields. The list drives
//! both the form layout served to clients and the validation of the
//! `field_values` submitted with a destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Input kind of a dynamic field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Select,
    Multiselect,
    Checkbox,
    Date,
    Image,
    Location,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Image => "image",
            FieldType::Location => "location",
        }
    }

    /// Rendered on a row of its own whatever width is stored
    pub fn forces_full_width(&self) -> bool {
        matches!(self, FieldType::Textarea | FieldType::Location | FieldType::Image)
    }

    /// Needs a non-empty `choices` list
    pub fn needs_choices(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Multiselect)
    }

    /// Stored as free text, so `max_length` applies
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::Textarea)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "number" => Ok(FieldType::Number),
            "select" => Ok(FieldType::Select),
            "multiselect" => Ok(FieldType::Multiselect),
            "checkbox" => Ok(FieldType::Checkbox),
            "date" => Ok(FieldType::Date),
            "image" => Ok(FieldType::Image),
            "location" => Ok(FieldType::Location),
            _ => Err(anyhow::anyhow!("Invalid field type: {}", s)),
        }
    }
}

/// Stored layout width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldWidth {
    #[default]
    Full,
    Half,
}

impl fmt::Display for FieldWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldWidth::Full => write!(f, "full"),
            FieldWidth::Half => write!(f, "half"),
        }
    }
}

impl FromStr for FieldWidth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(FieldWidth::Full),
            "half" => Ok(FieldWidth::Half),
            _ => Err(anyhow::anyhow!("Invalid field width: {}", s)),
        }
    }
}

/// Type-specific settings, persisted as a JSON object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldOptions {
    /// Allowed values for `select` and `multiselect`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Lower bound for `number`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for `number`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Character limit for `text` and `textarea`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// One admin-defined input of a category's destination form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub id: i64,
    pub category_id: i64,
    /// Key under which the value is stored in `field_values`
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub sort_order: i32,
    pub width: FieldWidth,
    pub options: FieldOptions,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormField {
    pub fn new(category_id: i64, name: String, label: String, field_type: FieldType) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            category_id,
            name,
            label,
            field_type,
            required: false,
            sort_order: 0,
            width: FieldWidth::Full,
            options: FieldOptions::default(),
            placeholder: None,
            help_text: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Width used by the layout pass
    pub fn effective_width(&self) -> FieldWidth {
        if self.field_type.forces_full_width() {
            FieldWidth::Full
        } else {
            self.width
        }
    }
}
