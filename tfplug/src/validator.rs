//! Reusable attribute validators
//!
//! Every validator skips null and unknown values; requiredness is checked by
//! the schema itself.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

fn string_value(request: &ValidatorRequest) -> Option<&str> {
    request.config_value.value.as_str()
}

fn respond(diagnostics: Vec<Diagnostic>) -> ValidatorResponse {
    ValidatorResponse { diagnostics }
}

/// Rejects empty strings
pub struct StringNotEmpty;

impl Validator for StringNotEmpty {
    fn description(&self) -> String {
        "string must not be empty".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = string_value(&request) {
            if s.is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must not be empty", request.path),
                        "Expected a non-empty string",
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Accepts only one of a fixed set of strings (case-sensitive)
pub struct StringOneOf {
    pub allowed: Vec<String>,
}

impl StringOneOf {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = string_value(&request) {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!(
                            "expected one of [{}], got \"{}\"",
                            self.allowed.join(", "),
                            s
                        ),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Requires a string that parses as a UUID
pub struct StringIsUuid;

impl Validator for StringIsUuid {
    fn description(&self) -> String {
        "string must be a valid UUID".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = string_value(&request) {
            if let Err(e) = uuid::Uuid::parse_str(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be a valid UUID", request.path),
                        format!("\"{}\": {}", s, e),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Requires an RFC 3339 timestamp such as 2020-01-01T00:00:00Z
pub struct StringIsRfc3339;

impl Validator for StringIsRfc3339 {
    fn description(&self) -> String {
        "string must be an RFC 3339 timestamp".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = string_value(&request) {
            if let Err(e) = chrono::DateTime::parse_from_rfc3339(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be an RFC 3339 timestamp", request.path),
                        format!("\"{}\": {}", s, e),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Bounds the character length of a string, inclusive on both ends
pub struct StringLengthBetween {
    pub min: usize,
    pub max: usize,
}

impl Validator for StringLengthBetween {
    fn description(&self) -> String {
        format!(
            "string length must be between {} and {}",
            self.min, self.max
        )
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = string_value(&request) {
            let len = s.chars().count();
            if len < self.min || len > self.max {
                diagnostics.push(
                    Diagnostic::error(
                        format!(
                            "{} must be between {} and {} characters",
                            request.path, self.min, self.max
                        ),
                        format!("Got length {}", len),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Rejects numbers with a fractional part
pub struct NumberIsWholeNumber;

impl Validator for NumberIsWholeNumber {
    fn description(&self) -> String {
        "number must be a whole number".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(n) = request.config_value.value.as_number() {
            if !n.is_finite() || n.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be a whole number", request.path),
                        format!("Got {}", n),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Applies another validator to every element of a list
pub struct EachElement(pub Box<dyn Validator>);

impl Validator for EachElement {
    fn description(&self) -> String {
        format!("each element: {}", self.0.description())
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::List(items) = &request.config_value.value {
            for (idx, item) in items.iter().enumerate() {
                let response = self.0.validate(ValidatorRequest {
                    config_value: crate::types::DynamicValue::new(item.clone()),
                    path: request.path.clone().index(idx as i64),
                });
                diagnostics.extend(response.diagnostics);
            }
        }
        respond(diagnostics)
    }
}
