//! Schema-driven validation of loosely typed JSON payloads.
//!
//! A [`Schema`] is an ordered list of field names paired with [`FieldRules`].
//! [`validate`] walks the schema in declaration order and collects one
//! [`Violation`] per failed rule. Fields that are not declared in the schema
//! are never inspected.

use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ServiceError;

/// JSON object handed from the HTTP layer to the services.
pub type Payload = Map<String, Value>;

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// A JSON number or a string that parses as one.
    Number,
    Boolean,
    Array,
}

impl FieldType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => as_number(value).is_some(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        };
        f.write_str(name)
    }
}

/// Rules applied to a single field.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    field_type: Option<FieldType>,
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    one_of: Option<&'static [&'static str]>,
    pattern: Option<Regex>,
}

impl FieldRules {
    /// Creates rules that expect the given JSON type.
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Restricts string values to the given set.
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.one_of = Some(allowed);
        self
    }

    /// Requires string values to match `pattern`.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

/// Ordered set of field rules.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(&'static str, FieldRules)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Fields are checked in the order they are added.
    pub fn field(mut self, name: &'static str, rules: FieldRules) -> Self {
        self.fields.push((name, rules));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldRules)> {
        self.fields.iter().map(|(name, rules)| (*name, rules))
    }
}

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("field '{field}' is required")]
    Required { field: &'static str },
    #[error("field '{field}' must be of type {expected}")]
    WrongType {
        field: &'static str,
        expected: FieldType,
    },
    #[error("field '{field}' must have at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("field '{field}' must have at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("field '{field}' must be greater than or equal to {min}")]
    BelowMinimum { field: &'static str, min: f64 },
    #[error("field '{field}' must be less than or equal to {max}")]
    AboveMaximum { field: &'static str, max: f64 },
    #[error("field '{field}' must be one of: {}", .allowed.join(", "))]
    NotAllowed {
        field: &'static str,
        allowed: &'static [&'static str],
    },
    #[error("field '{field}' does not match the expected format")]
    PatternMismatch { field: &'static str },
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns one message per violation, in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Converts the report into a `ServiceError::Validation` listing every
    /// violation, or `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.messages().join(", ")))
        }
    }
}

/// Validates `data` against `schema`, accumulating every violation.
///
/// A required field that is absent or `null` produces a single
/// [`Violation::Required`] and is not checked further. Optional fields that
/// are absent or `null` are skipped.
pub fn validate(data: &Payload, schema: &Schema) -> ValidationReport {
    let mut violations = Vec::new();

    for (field, rules) in schema.fields() {
        let value = match data.get(field) {
            None | Some(Value::Null) => {
                if rules.required {
                    violations.push(Violation::Required { field });
                }
                continue;
            }
            Some(value) => value,
        };

        if let Some(expected) = rules.field_type {
            if !expected.accepts(value) {
                violations.push(Violation::WrongType { field, expected });
            }
        }

        // Lengths are counted in UTF-16 code units.
        if let Value::String(text) = value {
            let length = text.encode_utf16().count();
            if let Some(min) = rules.min_length {
                if length < min {
                    violations.push(Violation::TooShort { field, min });
                }
            }
            if let Some(max) = rules.max_length {
                if length > max {
                    violations.push(Violation::TooLong { field, max });
                }
            }
        }

        if let Some(number) = as_number(value) {
            if let Some(min) = rules.min {
                if number < min {
                    violations.push(Violation::BelowMinimum { field, min });
                }
            }
            if let Some(max) = rules.max {
                if number > max {
                    violations.push(Violation::AboveMaximum { field, max });
                }
            }
        }

        if let (Some(allowed), Value::String(text)) = (rules.one_of, value) {
            if !allowed.contains(&text.as_str()) {
                violations.push(Violation::NotAllowed { field, allowed });
            }
        }

        if let (Some(pattern), Value::String(text)) = (&rules.pattern, value) {
            if !pattern.is_match(text) {
                violations.push(Violation::PatternMismatch { field });
            }
        }
    }

    ValidationReport { violations }
}

/// Reads a JSON number, or a string holding one. Blank strings count as zero.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Some(0.0);
            }
            trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
        }
        _ => None,
    }
}

/// Parses the leading integer of `raw`.
///
/// Leading whitespace and a sign are accepted and anything after the digits
/// is ignored, so `"12abc"` yields `12` while `"abc"` yields `None`. Digit
/// runs too large for `i64` saturate, so they still parse but match no record.
pub fn parse_id(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Same as [`parse_id`] for JSON values. Numbers are truncated; any type
/// other than a number or a string is unparseable.
pub fn parse_id_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite())
                .map(|float| float.trunc() as i64)
        }),
        Value::String(text) => parse_id(text),
        _ => None,
    }
}

/// Parses a path id, failing when it is missing or not a number.
///
/// `entity` names the record kind in the error message, e.g. `"Task"`.
pub fn parse_required_id(raw: &str, entity: &str) -> Result<i64, ServiceError> {
    if raw.is_empty() {
        return Err(ServiceError::Validation(format!("{entity} ID is required")));
    }
    parse_id(raw)
        .ok_or_else(|| ServiceError::Validation(format!("{entity} ID must be a number")))
}
