//! Best-effort coercion of raw field values to their declared types.
//!
//! Coercion never fails a resource build: a value that cannot safely be
//! converted stays raw and the mismatch is recorded as a
//! [`CoercionWarning`] attached to the built resource.

use crate::field::{FieldDefinition, FieldType};
use chrono::DateTime;
use serde_json::{Number, Value, json};
use std::fmt;

/// A non-fatal type mismatch or validation failure recorded during
/// coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    pub field_id: String,
    pub reason: String,
    /// The offending value, kept so callers can inspect what arrived.
    pub raw: Value,
}

impl CoercionWarning {
    /// Records a mismatch for `field_id`, keeping the offending value.
    pub fn new(field_id: &str, reason: impl Into<String>, raw: &Value) -> Self {
        Self {
            field_id: field_id.to_string(),
            reason: reason.into(),
            raw: raw.clone(),
        }
    }
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {}", self.field_id, self.reason)
    }
}

/// Coerces a raw field value against its definition.
///
/// Returns the (possibly converted) value and any warnings. Link and
/// array-of-link structure is left untouched here — reference resolution
/// belongs to the graph builder — but array elements of scalar item
/// types are coerced individually.
#[must_use]
pub fn coerce_field(def: &FieldDefinition, value: Value) -> (Value, Vec<CoercionWarning>) {
    let mut warnings = Vec::new();

    // Null is "explicitly empty", not a mismatch.
    if value.is_null() {
        return (value, warnings);
    }

    let coerced = match def.field_type {
        FieldType::Array => coerce_array(def, value, &mut warnings),
        _ => coerce_scalar(&def.id, def.field_type, value, &mut warnings),
    };

    apply_validations(def, &coerced, &mut warnings);
    (coerced, warnings)
}

fn coerce_array(def: &FieldDefinition, value: Value, warnings: &mut Vec<CoercionWarning>) -> Value {
    let Value::Array(elements) = value else {
        warnings.push(CoercionWarning::new(
            &def.id,
            format!("expected an array, got {}", kind_of(&value)),
            &value,
        ));
        return value;
    };

    let item_type = def
        .items
        .as_ref()
        .map_or(FieldType::Unknown, |items| items.field_type);
    if item_type == FieldType::Link {
        // Link elements are resolved by the graph builder.
        return Value::Array(elements);
    }

    Value::Array(
        elements
            .into_iter()
            .map(|element| coerce_scalar(&def.id, item_type, element, warnings))
            .collect(),
    )
}

fn coerce_scalar(
    field_id: &str,
    field_type: FieldType,
    value: Value,
    warnings: &mut Vec<CoercionWarning>,
) -> Value {
    match field_type {
        // Pass-through types. Links are the resolver's concern.
        FieldType::Object | FieldType::Unknown | FieldType::Link => value,

        FieldType::Symbol | FieldType::Text => match &value {
            Value::String(_) => value,
            Value::Number(n) => json!(n.to_string()),
            Value::Bool(b) => json!(b.to_string()),
            _ => {
                warnings.push(CoercionWarning::new(
                    field_id,
                    format!("expected a string, got {}", kind_of(&value)),
                    &value,
                ));
                value
            }
        },

        FieldType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => value,
            Value::Number(n) => match n.as_f64() {
                // Lossless truncation only.
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => json!(f as i64),
                _ => {
                    warnings.push(CoercionWarning::new(
                        field_id,
                        "expected an integer, got a fractional number",
                        &value,
                    ));
                    value
                }
            },
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => json!(i),
                Err(_) => {
                    warnings.push(CoercionWarning::new(
                        field_id,
                        "expected an integer, got a non-numeric string",
                        &value,
                    ));
                    value
                }
            },
            _ => {
                warnings.push(CoercionWarning::new(
                    field_id,
                    format!("expected an integer, got {}", kind_of(&value)),
                    &value,
                ));
                value
            }
        },

        FieldType::Number => match &value {
            Value::Number(_) => value,
            Value::String(s) => match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Value::Number(n),
                None => {
                    warnings.push(CoercionWarning::new(
                        field_id,
                        "expected a number, got a non-numeric string",
                        &value,
                    ));
                    value
                }
            },
            _ => {
                warnings.push(CoercionWarning::new(
                    field_id,
                    format!("expected a number, got {}", kind_of(&value)),
                    &value,
                ));
                value
            }
        },

        FieldType::Boolean => match &value {
            Value::Bool(_) => value,
            Value::String(s) if s == "true" => json!(true),
            Value::String(s) if s == "false" => json!(false),
            _ => {
                warnings.push(CoercionWarning::new(
                    field_id,
                    format!("expected a boolean, got {}", kind_of(&value)),
                    &value,
                ));
                value
            }
        },

        FieldType::Date => match value.as_str() {
            Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => value,
            _ => {
                warnings.push(CoercionWarning::new(
                    field_id,
                    "expected an RFC 3339 date string",
                    &value,
                ));
                value
            }
        },

        FieldType::Location => {
            let ok = value.get("lat").is_some_and(Value::is_number)
                && value.get("lon").is_some_and(Value::is_number);
            if !ok {
                warnings.push(CoercionWarning::new(
                    field_id,
                    "expected an object with numeric lat/lon",
                    &value,
                ));
            }
            value
        }

        FieldType::Array => unreachable!("arrays are handled by coerce_array"),
    }
}

/// Applies the validation rules the client understands. Rules it does
/// not recognize are skipped; violations are warnings, never fatal.
fn apply_validations(def: &FieldDefinition, value: &Value, warnings: &mut Vec<CoercionWarning>) {
    for rule in &def.validations {
        if let Some(options) = rule.get("in").and_then(Value::as_array)
            && !options.contains(value)
        {
            warnings.push(CoercionWarning::new(
                &def.id,
                "value is not among the allowed options",
                value,
            ));
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
