//! Single-field validator
//!
//! Checks one `field:type` pair in isolation. Problems are reported as a
//! structured result with human-readable issues; nothing here returns an
//! error, however malformed the input.

use crate::models::{FieldSpec, FieldType};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::analyzer::{ConsistencyAnalyzer, Inconsistency, FIELD_NAME_PATTERN};

/// Parsed `field:type` input
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    #[validate(length(min = 1, max = 64, message = "Field name must be between 1 and 64 characters"))]
    #[validate(custom(function = "validate_field_name"))]
    pub name: String,
    #[validate(custom(function = "validate_field_type"))]
    pub field_type: String,
}

impl FieldInput {
    /// Split `name:type`; `None` when there is no separator
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, field_type) = raw.split_once(':')?;
        Some(Self {
            name: name.trim().to_string(),
            field_type: field_type.trim().to_string(),
        })
    }
}

/// Outcome of validating a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    pub valid: bool,
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Inconsistency>,
}

pub struct FieldValidator;

impl FieldValidator {
    /// Validate a `field:type` pair with no entity context
    pub fn validate(input: &str) -> FieldValidation {
        Self::validate_on(None, input)
    }

    /// Validate a `field:type` pair as if it were declared on `entity`.
    ///
    /// Structural problems (separator, identifier, unknown type) are reported
    /// first; the analyzer's field checks only run on structurally valid input.
    pub fn validate_on(entity: Option<&str>, input: &str) -> FieldValidation {
        let mut result = FieldValidation {
            input: input.to_string(),
            entity: entity.map(str::to_string),
            field: None,
            field_type: None,
            valid: false,
            issues: Vec::new(),
            findings: Vec::new(),
        };

        let Some(parsed) = FieldInput::parse(input) else {
            result
                .issues
                .push(format!("Expected 'field:type', got '{}'", input));
            return result;
        };

        result.field = Some(parsed.name.clone());
        result.field_type = FieldType::parse_known(&parsed.field_type);

        if let Err(errors) = parsed.validate() {
            result.issues = flatten_errors(&errors);
            return result;
        }

        let Some(field_type) = result.field_type else {
            return result;
        };

        let spec = FieldSpec::required(parsed.name, field_type);
        let findings = ConsistencyAnalyzer::check_field(entity.unwrap_or_default(), &spec);

        result.issues = findings
            .iter()
            .map(|f| format!("[{}] {} ({})", f.severity, f.description, f.suggested_fix))
            .collect();
        result.findings = findings;
        result.valid = result.issues.is_empty();
        result
    }
}

/// Human-readable messages, ordered by field for stable output
pub fn flatten_errors(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect()
}

fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if !FIELD_NAME_PATTERN.is_match(name) {
        let mut err = ValidationError::new("invalid_field_name");
        err.message = Some(
            format!(
                "Invalid field name '{}'. Must start with a lowercase letter and contain only letters and digits.",
                name
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

fn validate_field_type(raw: &str) -> Result<(), ValidationError> {
    if FieldType::parse_known(raw).is_none() {
        let mut err = ValidationError::new("unknown_field_type");
        err.message = Some(
            format!(
                "Unknown type '{}'. Expected one of: string, number, boolean, date, json, any, reference",
                raw
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}
