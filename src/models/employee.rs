//! Employee attendance record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, FieldErrors};

/// Maximum length of name, role and department fields.
pub const NAME_MAX_LEN: usize = 100;
/// Maximum length of the phone number field.
pub const PHONE_MAX_LEN: usize = 15;
/// Maximum length of an email address.
pub const EMAIL_MAX_LEN: usize = 254;

/// A single attendance entry for an employee.
///
/// `signature` is a free-text label that distinguishes check-in from
/// check-out events. `time_posted` is set once when the row is inserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: String,
    pub department: String,
    pub signature: String,
    pub time_posted: DateTime<Utc>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Validated, writable fields of an employee.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: String,
    pub department: String,
    pub signature: String,
}

impl From<&Employee> for EmployeeFields {
    fn from(employee: &Employee) -> Self {
        Self {
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone(),
            phone_number: employee.phone_number.clone(),
            role: employee.role.clone(),
            department: employee.department.clone(),
            signature: employee.signature.clone(),
        }
    }
}

/// Request body for creating, replacing or patching an employee.
///
/// Every field is optional at the wire level so that missing fields are
/// reported as validation errors rather than deserialization failures.
/// Unknown keys, including `id` and `time_posted`, are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl EmployeeRequest {
    /// Validate a full record (create or replace). All fields except
    /// `signature` must be present.
    pub fn into_fields(self) -> Result<EmployeeFields, AppError> {
        let mut errors = FieldErrors::new();

        let fields = EmployeeFields {
            first_name: required(&mut errors, "first_name", self.first_name, NAME_MAX_LEN),
            last_name: required(&mut errors, "last_name", self.last_name, NAME_MAX_LEN),
            email: email(&mut errors, self.email),
            phone_number: required(&mut errors, "phone_number", self.phone_number, PHONE_MAX_LEN),
            role: required(&mut errors, "role", self.role, NAME_MAX_LEN),
            department: required(&mut errors, "department", self.department, NAME_MAX_LEN),
            signature: self.signature.map(|s| s.trim().to_string()).unwrap_or_default(),
        };

        if errors.is_empty() {
            Ok(fields)
        } else {
            Err(AppError::invalid_fields(errors))
        }
    }

    /// Merge a partial update over an existing record, validating only the
    /// fields that were supplied.
    pub fn merge_into(self, existing: &Employee) -> Result<EmployeeFields, AppError> {
        let current = EmployeeFields::from(existing);
        let merged = EmployeeRequest {
            first_name: Some(self.first_name.unwrap_or(current.first_name)),
            last_name: Some(self.last_name.unwrap_or(current.last_name)),
            email: Some(self.email.unwrap_or(current.email)),
            phone_number: Some(self.phone_number.unwrap_or(current.phone_number)),
            role: Some(self.role.unwrap_or(current.role)),
            department: Some(self.department.unwrap_or(current.department)),
            signature: Some(self.signature.unwrap_or(current.signature)),
        };
        merged.into_fields()
    }
}

fn required(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> String {
    let Some(value) = value else {
        errors.insert(field.to_string(), "This field is required.".to_string());
        return String::new();
    };

    let value = value.trim().to_string();
    if value.is_empty() {
        errors.insert(field.to_string(), "This field may not be blank.".to_string());
    } else if value.chars().count() > max_len {
        errors.insert(
            field.to_string(),
            format!("Ensure this field has no more than {} characters.", max_len),
        );
    }
    value
}

fn email(errors: &mut FieldErrors, value: Option<String>) -> String {
    let value = required(errors, "email", value, EMAIL_MAX_LEN);
    if !errors.contains_key("email") && !looks_like_email(&value) {
        errors.insert(
            "email".to_string(),
            "Enter a valid email address.".to_string(),
        );
    }
    value
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
