//! Boundary validation for incoming payloads
//!
//! Request bodies arrive as loosely-typed drafts (every field optional, plain
//! strings). The functions here turn them into typed values or fail with a
//! `ReporterError::Validation` naming the first problem found.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::model::{Category, IncidentChanges, IncidentKind, IncidentStatus, ANONYMOUS_REPORTER};
use crate::types::{ReporterError, Result};

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 5000;
pub const LOCATION_MIN: usize = 3;
pub const LOCATION_MAX: usize = 500;
pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 128;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok());

/// Incident fields as submitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Anonymous submission: the incident plus optional contact details
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnonymousDraft {
    #[serde(flatten)]
    pub incident: IncidentDraft,
    #[serde(default)]
    pub reporter_email: Option<String>,
    #[serde(default)]
    pub reporter_name: Option<String>,
}

/// Fields any permitted editor (owner or admin) may change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditableFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Update body. Unknown keys are dropped by serde.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentPatch {
    #[serde(flatten)]
    pub fields: EditableFields,
    /// Honoured for admins only
    #[serde(default)]
    pub status: Option<String>,
}

/// Status-change body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusChange {
    #[serde(default)]
    pub status: Option<String>,
}

/// A fully validated new incident
#[derive(Debug, Clone, PartialEq)]
pub struct ValidIncident {
    pub title: String,
    pub description: String,
    pub kind: IncidentKind,
    pub category: Option<Category>,
    pub location: String,
}

/// Validated anonymous contact details
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterContact {
    pub email: Option<String>,
    pub name: String,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ReporterError::validation(format!("{} is required", field))),
    }
}

fn bounded(value: &str, field: &str, min: usize, max: usize) -> Result<String> {
    let len = value.chars().count();
    if len < min {
        return Err(ReporterError::validation(format!(
            "{} must be at least {} characters long",
            field, min
        )));
    }
    if len > max {
        return Err(ReporterError::validation(format!(
            "{} is too long (max {} characters)",
            field, max
        )));
    }
    Ok(value.to_string())
}

pub fn validate_title(value: &str) -> Result<String> {
    bounded(value.trim(), "Title", TITLE_MIN, TITLE_MAX)
}

pub fn validate_description(value: &str) -> Result<String> {
    bounded(value.trim(), "Description", DESCRIPTION_MIN, DESCRIPTION_MAX)
}

pub fn validate_location(value: &str) -> Result<String> {
    bounded(value.trim(), "Location", LOCATION_MIN, LOCATION_MAX)
}

/// Parse a category and check it belongs to `kind`
pub fn validate_category(value: &str, kind: IncidentKind) -> Result<Category> {
    let invalid = || {
        ReporterError::validation(match kind {
            IncidentKind::Redflag => "Invalid category for red flag incident",
            IncidentKind::Intervention => "Invalid category for intervention incident",
        })
    };
    let category: Category = value.trim().parse().map_err(|_| invalid())?;
    if category.allowed_for(kind) {
        Ok(category)
    } else {
        Err(invalid())
    }
}

fn optional_category(value: &Option<String>, kind: IncidentKind) -> Result<Option<Category>> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => validate_category(v, kind).map(Some),
        _ => Ok(None),
    }
}

impl IncidentDraft {
    /// Check required fields, lengths, type and category
    pub fn validate(&self) -> Result<ValidIncident> {
        let title = required(&self.title, "Title")?;
        let description = required(&self.description, "Description")?;
        let kind = required(&self.kind, "Type")?;
        let location = required(&self.location, "Location")?;

        let title = validate_title(title)?;
        let description = validate_description(description)?;
        let kind: IncidentKind = kind.parse()?;
        let location = validate_location(location)?;
        let category = optional_category(&self.category, kind)?;

        Ok(ValidIncident {
            title,
            description,
            kind,
            category,
            location,
        })
    }
}

impl AnonymousDraft {
    /// Contact details: email trimmed and lower-cased (empty means absent),
    /// name defaulting to "Anonymous". The email is only a linking key, so
    /// its format is not checked.
    pub fn contact(&self) -> ReporterContact {
        let email = match self.reporter_email.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => Some(e.to_lowercase()),
            _ => None,
        };
        let name = match self.reporter_name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => ANONYMOUS_REPORTER.to_string(),
        };
        ReporterContact { email, name }
    }
}

impl EditableFields {
    /// Validate present fields into a change set.
    ///
    /// The category, new or stored, must fit the type the incident will have
    /// after the edit.
    pub fn validate(
        &self,
        current_kind: IncidentKind,
        current_category: Option<Category>,
    ) -> Result<IncidentChanges> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let kind = self
            .kind
            .as_deref()
            .map(|k| k.trim().parse::<IncidentKind>())
            .transpose()?;
        let location = self
            .location
            .as_deref()
            .map(validate_location)
            .transpose()?;
        let target_kind = kind.unwrap_or(current_kind);
        let category = optional_category(&self.category, target_kind)?;
        if category.is_none() {
            if let Some(stored) = current_category {
                if !stored.allowed_for(target_kind) {
                    // re-run through the parser for the type-specific message
                    validate_category(stored.as_str(), target_kind)?;
                }
            }
        }

        Ok(IncidentChanges {
            title,
            description,
            kind,
            category,
            location,
            status: None,
        })
    }
}

/// Parse a submitted status value
pub fn validate_status(value: Option<&str>) -> Result<IncidentStatus> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.parse(),
        _ => Err(ReporterError::validation("Status is required")),
    }
}

/// Validate and lower-case an email address of the form `local@domain.tld`
pub fn validate_email(value: &str) -> Result<String> {
    let email = value.trim();
    if email.is_empty() {
        return Err(ReporterError::validation("Email is required"));
    }
    if !email_shape_ok(email) {
        return Err(ReporterError::validation("Invalid email format"));
    }
    if email.len() > EMAIL_MAX {
        return Err(ReporterError::validation("Email is too long"));
    }
    Ok(email.to_lowercase())
}

fn email_shape_ok(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

pub fn validate_password(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ReporterError::validation("Password is required"));
    }
    let len = value.chars().count();
    if len < PASSWORD_MIN {
        return Err(ReporterError::validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN
        )));
    }
    if len > PASSWORD_MAX {
        return Err(ReporterError::validation("Password is too long"));
    }
    let has_letter = value.chars().any(char::is_alphabetic);
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(ReporterError::validation(
            "Password must contain both letters and numbers",
        ));
    }
    Ok(())
}

pub fn validate_name(value: &str) -> Result<String> {
    let name = value.trim();
    if name.is_empty() {
        return Err(ReporterError::validation("Name is required"));
    }
    bounded(name, "Name", NAME_MIN, NAME_MAX)
}
