//! Dynamic form engine
//!
//! Each category owns an ordered list of [`FormField`] definitions. They drive
//! two passes:
//! - [`layout`] groups fields into rendered rows (two consecutive half-width
//!   fields share a row)
//! - [`validate_values`] checks a destination's submitted values, collecting
//!   every error instead of stopping at the first one
//!
//! Field definitions are cached per category.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, FormFieldRepository};
use crate::models::{FieldOptions, FieldType, FieldWidth, FormField};
use anyhow::Context;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Cache key prefix for field lists, followed by the category id
pub const FORM_CACHE_PREFIX: &str = "form:category:";

const FORM_CACHE_TTL_SECS: u64 = 3600;

const FIELD_NAME_MAX_LENGTH: usize = 64;

static FIELD_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*$").expect("field name pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum FormServiceError {
    #[error("Form field not found: {0}")]
    NotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    /// Field name already used in the category
    #[error("Field name already exists: {0}")]
    DuplicateName(String),

    /// Invalid field definition
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Submitted values failed validation
    #[error("Invalid form values")]
    InvalidValues(Vec<FieldError>),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// One failed check on a submitted value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// How a layout row is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowLayout {
    /// One full-width field
    Full,
    /// Two half-width fields side by side
    Pair,
    /// One half-width field, trailing slot empty
    Half,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormRow {
    pub layout: RowLayout,
    pub fields: Vec<FormField>,
}

/// Field definitions of a category together with their layout
#[derive(Debug, Clone, Serialize)]
pub struct CategoryForm {
    pub category_id: i64,
    pub fields: Vec<FormField>,
    pub rows: Vec<FormRow>,
}

/// Group ordered fields into rows.
///
/// Full-width fields (including textarea, location and image fields, whatever
/// their stored width) take a row of their own. A half-width field pairs with
/// the next field when that one is half-width too.
pub fn layout(fields: &[FormField]) -> Vec<FormRow> {
    let mut rows = Vec::new();
    let mut iter = fields.iter().peekable();

    while let Some(field) = iter.next() {
        let row = match field.effective_width() {
            FieldWidth::Full => FormRow {
                layout: RowLayout::Full,
                fields: vec![field.clone()],
            },
            FieldWidth::Half => match iter.next_if(|next| next.effective_width() == FieldWidth::Half) {
                Some(partner) => FormRow {
                    layout: RowLayout::Pair,
                    fields: vec![field.clone(), partner.clone()],
                },
                None => FormRow {
                    layout: RowLayout::Half,
                    fields: vec![field.clone()],
                },
            },
        };
        rows.push(row);
    }

    rows
}

/// Absent, null, blank strings and empty arrays count as missing
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Validate submitted values against the field definitions.
///
/// Returns the normalized values (trimmed strings, numbers parsed, unknown
/// keys and missing optional values dropped) or every error found.
pub fn validate_values(
    fields: &[FormField],
    values: &Map<String, Value>,
) -> Result<Map<String, Value>, Vec<FieldError>> {
    let mut normalized = Map::new();
    let mut errors = Vec::new();

    for field in fields {
        let value = values.get(&field.name);

        if field.field_type == FieldType::Checkbox {
            match value {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.push(FieldError::new(&field.name, format!("{} must be checked", field.label)));
                    }
                }
                Some(Value::Bool(checked)) => {
                    if field.required && !checked {
                        errors.push(FieldError::new(&field.name, format!("{} must be checked", field.label)));
                    } else {
                        normalized.insert(field.name.clone(), Value::Bool(*checked));
                    }
                }
                Some(_) => errors.push(FieldError::new(&field.name, "Must be true or false")),
            }
            continue;
        }

        if is_missing(value) {
            if field.required {
                errors.push(FieldError::new(&field.name, format!("{} is required", field.label)));
            }
            continue;
        }

        // is_missing ruled out None above
        let Some(value) = value else { continue };
        match normalize_value(field, value) {
            Ok(v) => {
                normalized.insert(field.name.clone(), v);
            }
            Err(message) => errors.push(FieldError::new(&field.name, message)),
        }
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

fn normalize_value(field: &FormField, value: &Value) -> Result<Value, String> {
    let options = &field.options;
    match field.field_type {
        FieldType::Text | FieldType::Textarea | FieldType::Image => {
            let text = value.as_str().ok_or("Must be a string")?.trim();
            if let Some(max) = options.max_length {
                if text.chars().count() > max {
                    return Err(format!("Must be at most {} characters", max));
                }
            }
            Ok(Value::String(text.to_string()))
        }
        FieldType::Number => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|n| n.is_finite())
            .ok_or("Must be a number")?;
            if let Some(min) = options.min {
                if number < min {
                    return Err(format!("Must be at least {}", min));
                }
            }
            if let Some(max) = options.max {
                if number > max {
                    return Err(format!("Must be at most {}", max));
                }
            }
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| "Must be a number".to_string())
        }
        FieldType::Select => {
            let choice = value.as_str().ok_or("Must be a string")?.trim();
            if !options.choices.iter().any(|c| c == choice) {
                return Err(format!("'{}' is not one of the allowed choices", choice));
            }
            Ok(Value::String(choice.to_string()))
        }
        FieldType::Multiselect => {
            let items = value.as_array().ok_or("Must be a list of choices")?;
            let mut picked = Vec::with_capacity(items.len());
            for item in items {
                let choice = item.as_str().ok_or("Must be a list of choices")?.trim();
                if !options.choices.iter().any(|c| c == choice) {
                    return Err(format!("'{}' is not one of the allowed choices", choice));
                }
                if !picked.iter().any(|p: &Value| p.as_str() == Some(choice)) {
                    picked.push(Value::String(choice.to_string()));
                }
            }
            Ok(Value::Array(picked))
        }
        FieldType::Date => {
            let text = value.as_str().ok_or("Must be a date (YYYY-MM-DD)")?.trim();
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| "Must be a date (YYYY-MM-DD)")?;
            Ok(Value::String(text.to_string()))
        }
        FieldType::Location => match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            Value::Object(_) => Ok(value.clone()),
            _ => Err("Must be an address or a location object".to_string()),
        },
        // Handled before normalization
        FieldType::Checkbox => Ok(value.clone()),
    }
}

/// Check a field definition
pub fn validate_definition(field: &FormField) -> Result<(), String> {
    if field.name.len() > FIELD_NAME_MAX_LENGTH || !FIELD_NAME_RE.is_match(&field.name) {
        return Err(format!(
            "Field name '{}' must start with a lowercase letter and contain only a-z, 0-9 and '_' (max {} characters)",
            field.name, FIELD_NAME_MAX_LENGTH
        ));
    }
    if field.label.trim().is_empty() {
        return Err("Field label cannot be empty".to_string());
    }

    let options = &field.options;
    if field.field_type.needs_choices() {
        if options.choices.is_empty() {
            return Err(format!("A {} field needs at least one choice", field.field_type));
        }
        if options.choices.iter().any(|c| c.trim().is_empty()) {
            return Err("Choices cannot be empty".to_string());
        }
        let unique: HashSet<&str> = options.choices.iter().map(String::as_str).collect();
        if unique.len() != options.choices.len() {
            return Err("Choices must be unique".to_string());
        }
    }
    if let (Some(min), Some(max)) = (options.min, options.max) {
        if min > max {
            return Err(format!("min ({}) cannot be greater than max ({})", min, max));
        }
    }
    if options.max_length == Some(0) {
        return Err("max_length must be greater than 0".to_string());
    }

    Ok(())
}

/// Input for creating a form field
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFieldInput {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub width: FieldWidth,
    #[serde(default)]
    pub options: FieldOptions,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    /// Appended after the last field when absent
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl CreateFieldInput {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            width: FieldWidth::Full,
            options: FieldOptions::default(),
            placeholder: None,
            help_text: None,
            sort_order: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn half(mut self) -> Self {
        self.width = FieldWidth::Half;
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.options.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Input for updating a form field; `None` leaves a member unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFieldInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub width: Option<FieldWidth>,
    #[serde(default)]
    pub options: Option<FieldOptions>,
    #[serde(default, deserialize_with = "crate::services::category::deserialize_some")]
    pub placeholder: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::services::category::deserialize_some")]
    pub help_text: Option<Option<String>>,
}

pub struct FormService {
    repo: Arc<dyn FormFieldRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl FormService {
    pub fn new(
        repo: Arc<dyn FormFieldRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self::with_cache_ttl(repo, category_repo, cache, Duration::from_secs(FORM_CACHE_TTL_SECS))
    }

    /// Create a form service with custom cache TTL
    pub fn with_cache_ttl(
        repo: Arc<dyn FormFieldRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            category_repo,
            cache,
            cache_ttl,
        }
    }

    /// Fields of a category ordered by sort order, then id
    pub async fn list_fields(&self, category_id: i64) -> Result<Vec<FormField>, FormServiceError> {
        let cache_key = format!("{}{}", FORM_CACHE_PREFIX, category_id);
        if let Some(fields) = self.cache.get::<Vec<FormField>>(&cache_key).await.ok().flatten() {
            return Ok(fields);
        }

        self.require_category(category_id).await?;
        let fields = self
            .repo
            .list_by_category(category_id)
            .await
            .context("Failed to list form fields")?;

        let _ = self.cache.set(&cache_key, &fields, self.cache_ttl).await;

        Ok(fields)
    }

    /// Fields plus their layout rows
    pub async fn form(&self, category_id: i64) -> Result<CategoryForm, FormServiceError> {
        let fields = self.list_fields(category_id).await?;
        let rows = layout(&fields);
        Ok(CategoryForm {
            category_id,
            fields,
            rows,
        })
    }

    /// Validate destination values against the category's fields
    pub async fn validate_submission(
        &self,
        category_id: i64,
        values: &Map<String, Value>,
    ) -> Result<Map<String, Value>, FormServiceError> {
        let fields = self.list_fields(category_id).await?;
        validate_values(&fields, values).map_err(FormServiceError::InvalidValues)
    }

    pub async fn create_field(
        &self,
        category_id: i64,
        input: CreateFieldInput,
    ) -> Result<FormField, FormServiceError> {
        self.require_category(category_id).await?;

        let mut field = FormField::new(
            category_id,
            input.name.trim().to_string(),
            input.label.trim().to_string(),
            input.field_type,
        );
        field.required = input.required;
        field.width = input.width;
        field.options = input.options;
        field.placeholder = non_empty(input.placeholder);
        field.help_text = non_empty(input.help_text);
        validate_definition(&field).map_err(FormServiceError::ValidationError)?;

        if self
            .repo
            .exists_by_name(category_id, &field.name)
            .await
            .context("Failed to check field name")?
        {
            return Err(FormServiceError::DuplicateName(field.name));
        }

        field.sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .max_sort_order(category_id)
                .await
                .context("Failed to read field order")?
                .map_or(0, |max| max + 1),
        };

        let created = self.repo.create(&field).await.context("Failed to create form field")?;
        self.invalidate(category_id).await;

        tracing::info!("Form field '{}' added to category {}", created.name, category_id);
        Ok(created)
    }

    pub async fn update_field(&self, id: i64, input: UpdateFieldInput) -> Result<FormField, FormServiceError> {
        let mut field = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get form field")?
            .ok_or(FormServiceError::NotFound(id))?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name != field.name
                && self
                    .repo
                    .exists_by_name(field.category_id, &name)
                    .await
                    .context("Failed to check field name")?
            {
                return Err(FormServiceError::DuplicateName(name));
            }
            field.name = name;
        }
        if let Some(label) = input.label {
            field.label = label.trim().to_string();
        }
        if let Some(field_type) = input.field_type {
            field.field_type = field_type;
        }
        if let Some(required) = input.required {
            field.required = required;
        }
        if let Some(width) = input.width {
            field.width = width;
        }
        if let Some(options) = input.options {
            field.options = options;
        }
        if let Some(placeholder) = input.placeholder {
            field.placeholder = non_empty(placeholder);
        }
        if let Some(help_text) = input.help_text {
            field.help_text = non_empty(help_text);
        }
        validate_definition(&field).map_err(FormServiceError::ValidationError)?;

        let updated = self.repo.update(&field).await.context("Failed to update form field")?;
        self.invalidate(field.category_id).await;

        Ok(updated)
    }

    /// Delete a field; values already stored on destinations are left in place
    pub async fn delete_field(&self, id: i64) -> Result<(), FormServiceError> {
        let field = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get form field")?
            .ok_or(FormServiceError::NotFound(id))?;

        self.repo.delete(id).await.context("Failed to delete form field")?;
        self.invalidate(field.category_id).await;

        Ok(())
    }

    /// Reorder a category's fields; `ids` must list every field exactly once
    pub async fn reorder_fields(&self, category_id: i64, ids: Vec<i64>) -> Result<Vec<FormField>, FormServiceError> {
        self.require_category(category_id).await?;

        let current = self
            .repo
            .list_by_category(category_id)
            .await
            .context("Failed to list form fields")?;
        let expected: HashSet<i64> = current.iter().map(|f| f.id).collect();
        let given: HashSet<i64> = ids.iter().copied().collect();
        if given.len() != ids.len() || given != expected {
            return Err(FormServiceError::ValidationError(
                "Field order must list every field of the category exactly once".to_string(),
            ));
        }

        self.repo
            .reorder(category_id, &ids)
            .await
            .context("Failed to reorder form fields")?;
        self.invalidate(category_id).await;

        self.list_fields(category_id).await
    }

    async fn require_category(&self, category_id: i64) -> Result<(), FormServiceError> {
        match self
            .category_repo
            .get_by_id(category_id)
            .await
            .context("Failed to get category")?
        {
            Some(_) => Ok(()),
            None => Err(FormServiceError::CategoryNotFound(category_id)),
        }
    }

    async fn invalidate(&self, category_id: i64) {
        let _ = self
            .cache
            .delete(&format!("{}{}", FORM_CACHE_PREFIX, category_id))
            .await;
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
