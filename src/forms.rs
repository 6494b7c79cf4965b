//! HTML form payloads, their validation rules and field-level messages.
//!
//! Forms keep every field as the raw submitted string so that an invalid
//! submission can be rendered back exactly as typed.

use crate::{
    entities::{MenuCategory, NewMenuItem},
    errors::ServiceError,
    services::{images::Upload, MenuEdit},
};
use axum::extract::Multipart;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::BTreeMap, collections::HashMap, str::FromStr};
use validator::{Validate, ValidationError, ValidationErrors};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_A_DECIMAL: &str = "Not a valid decimal value.";
pub const NOT_A_CHOICE: &str = "Not a valid choice.";
pub const PASSWORD_MISMATCH: &str = "Password do not Match!";
pub const PRICE_OUT_OF_RANGE: &str = "Number must be at most 99999999.99.";

/// Largest magnitude a `DECIMAL(10,2)` price column holds
const PRICE_LIMIT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Multipart field carrying image uploads
pub const FILE_FIELD: &str = "file";

/// Messages keyed by field name, rendered next to the inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                out.add(field, describe(error));
            }
        }
        out
    }
}

fn param_u64(error: &ValidationError, key: &str) -> Option<u64> {
    error.params.get(key).and_then(|v| v.as_u64())
}

/// Human message for one failed rule
fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "length" => match (param_u64(error, "min"), param_u64(error, "max")) {
            (Some(min), Some(max)) => {
                format!("Field must be between {} and {} characters long.", min, max)
            }
            (Some(min), None) => format!("Field must be at least {} characters long.", min),
            (None, Some(max)) => format!("Field cannot be longer than {} characters.", max),
            (None, None) => "Invalid length.".to_string(),
        },
        "required" => REQUIRED.to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Validates the form, translating failures into per-field messages
pub fn check<T: Validate>(form: &T) -> Result<(), FormErrors> {
    form.validate()
        .map_err(|errors| FormErrors::from_validation(&errors))
}

fn validate_price(raw: &str) -> Result<(), ValidationError> {
    parse_price(raw).map(|_| ())
}

fn parse_price(raw: &str) -> Result<Decimal, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(error_with_message("required", REQUIRED));
    }
    let price = Decimal::from_str(raw)
        .map_err(|_| error_with_message("decimal", NOT_A_DECIMAL))?;
    // Same rounding the database applies to a 2-place decimal column
    let price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // A zero amount counts as missing, like an empty input
    if price.is_zero() {
        return Err(error_with_message("required", REQUIRED));
    }
    if price.abs() > PRICE_LIMIT {
        return Err(error_with_message("range", PRICE_OUT_OF_RANGE));
    }
    Ok(price)
}

fn validate_category(raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        return Err(error_with_message("required", REQUIRED));
    }
    MenuCategory::from_str(raw.trim())
        .map(|_| ())
        .map_err(|_| error_with_message("choice", NOT_A_CHOICE))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 4, max = 25))]
    pub username: String,
    #[validate(length(min = 6, max = 50))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(
        length(min = 1, message = "This field is required."),
        must_match(other = "confirm", message = "Password do not Match!")
    )]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm: String,
}

/// Credentials are looked up as typed, without shape checks
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct MenuForm {
    #[validate(custom = "validate_category")]
    pub menu_type: String,
    #[validate(length(min = 1, max = 2000))]
    pub name: String,
    #[validate(length(min = 10))]
    pub ingredients: String,
    #[validate(custom = "validate_price")]
    pub price: String,
}

impl MenuForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Self {
            menu_type: field("menu_type"),
            name: field("name"),
            ingredients: field("ingredients"),
            price: field("price"),
        }
    }

    /// Typed values of a form that already passed validation
    pub fn parsed(&self, image: Option<String>) -> Result<(MenuCategory, NewMenuItem), ServiceError> {
        let category = MenuCategory::from_str(self.menu_type.trim())
            .map_err(|_| ServiceError::ValidationError(NOT_A_CHOICE.into()))?;
        let price = parse_price(&self.price)
            .map_err(|_| ServiceError::ValidationError(NOT_A_DECIMAL.into()))?;
        Ok((
            category,
            NewMenuItem {
                name: self.name.clone(),
                ingredients: self.ingredients.clone(),
                price,
                image,
            },
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct MenuEditForm {
    #[validate(length(min = 1, max = 2000))]
    pub name: String,
    #[validate(length(min = 10))]
    pub ingredients: String,
    #[validate(custom = "validate_price")]
    pub price: String,
    /// Current image, shown next to the file input
    #[serde(skip_deserializing)]
    pub image: Option<String>,
}

impl MenuEditForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Self {
            name: field("name"),
            ingredients: field("ingredients"),
            price: field("price"),
            image: None,
        }
    }

    pub fn from_item(item: &crate::entities::MenuItem) -> Self {
        Self {
            name: item.name.clone(),
            ingredients: item.ingredients.clone(),
            price: item.price.to_string(),
            image: item.image.clone(),
        }
    }

    pub fn parsed(&self, image: Option<String>) -> Result<MenuEdit, ServiceError> {
        let price = parse_price(&self.price)
            .map_err(|_| ServiceError::ValidationError(NOT_A_DECIMAL.into()))?;
        Ok(MenuEdit {
            name: self.name.clone(),
            ingredients: self.ingredients.clone(),
            price,
            image,
        })
    }
}

/// A multipart submission split into text fields and uploaded files
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<Upload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("malformed form data: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == FILE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::BadRequest(format!("upload interrupted: {}", e)))?;
                form.files.push(Upload { filename, content });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServiceError::BadRequest(format!("malformed form data: {}", e)))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }
}

/// Choices for the category selector
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn category_options(selected: &str) -> Vec<CategoryOption> {
    MenuCategory::all()
        .into_iter()
        .map(|category| CategoryOption {
            value: category.table_name(),
            label: category.label(),
            selected: category.table_name() == selected,
        })
        .collect()
}
