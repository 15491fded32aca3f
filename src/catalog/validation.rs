//! Argument validation against an operation's declared schema.
//!
//! Validation is strict: undeclared arguments are rejected, required arguments
//! must be present and non-blank, and typed values are checked recursively through
//! object sub-schemas and arrays. Defaults are applied for omitted arguments.

use super::types::{
    ArgumentConstraint, ArgumentLocation, ArgumentSpec, ArgumentType, OperationDescriptor,
};
use crate::error::{ValidationError, ValidationResult};
use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Arguments that passed validation, with defaults applied.
///
/// Enumerated arguments still hold their labels; rendering maps them to wire values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedArguments {
    values: BTreeMap<String, Value>,
}

impl ValidatedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.values.get(name).and_then(Value::as_u64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Validate caller arguments against `descriptor`.
///
/// `null` is accepted as "no arguments".
///
/// # Examples
///
/// ```rust
/// use freshservice_mcp::catalog::{ArgumentSpec, OperationDescriptor, validate_arguments};
/// use freshservice_mcp::upstream::HttpMethod;
/// use serde_json::json;
///
/// let descriptor = OperationDescriptor::builder("get_ticket", HttpMethod::Get, "/tickets/{ticket_id}")
///     .argument(ArgumentSpec::id("ticket_id").required().in_path())
///     .build();
///
/// assert!(validate_arguments(&descriptor, &json!({"ticket_id": 42})).is_ok());
/// assert!(validate_arguments(&descriptor, &json!({"ticket_id": 0})).is_err());
/// assert!(validate_arguments(&descriptor, &json!({})).is_err());
/// ```
pub fn validate_arguments(
    descriptor: &OperationDescriptor,
    arguments: &Value,
) -> ValidationResult<ValidatedArguments> {
    let empty = Map::new();
    let object = match arguments {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::NotAnObject {
                actual: value_type(other).to_string(),
            });
        }
    };

    let values = validate_fields("", &descriptor.arguments, object)?;

    for constraint in &descriptor.constraints {
        match constraint {
            ArgumentConstraint::AtLeastOneOf(names) => {
                if !names.iter().any(|name| values.contains_key(name)) {
                    return Err(ValidationError::AtLeastOneOf {
                        fields: names.clone(),
                    });
                }
            }
        }
    }

    Ok(ValidatedArguments { values })
}

fn validate_fields(
    prefix: &str,
    specs: &[ArgumentSpec],
    object: &Map<String, Value>,
) -> ValidationResult<BTreeMap<String, Value>> {
    if let Some(unknown) = object
        .keys()
        .find(|key| !specs.iter().any(|spec| &spec.name == *key))
    {
        return Err(ValidationError::UnknownField {
            field: join_path(prefix, unknown),
        });
    }

    let mut values = BTreeMap::new();
    for spec in specs {
        let path = join_path(prefix, &spec.name);
        let supplied = object
            .get(&spec.name)
            .filter(|value| !value.is_null() && !is_blank_optional_filter(spec, value));
        match supplied {
            Some(value) => {
                let checked = check_value(&path, &spec.arg_type, spec.required, value)?;
                values.insert(spec.name.clone(), checked);
            }
            None => {
                if let Some(default) = &spec.default {
                    values.insert(spec.name.clone(), default.clone());
                } else if spec.required {
                    return Err(ValidationError::missing_required(path));
                }
            }
        }
    }
    Ok(values)
}

/// Blank optional filter values would render empty `field:''` clauses.
fn is_blank_optional_filter(spec: &ArgumentSpec, value: &Value) -> bool {
    !spec.required
        && matches!(spec.location, ArgumentLocation::Filter { .. })
        && value.as_str().is_some_and(|text| text.trim().is_empty())
}

fn check_value(
    path: &str,
    arg_type: &ArgumentType,
    required: bool,
    value: &Value,
) -> ValidationResult<Value> {
    match arg_type {
        ArgumentType::String => {
            let text = value
                .as_str()
                .ok_or_else(|| ValidationError::invalid_type(path, "string", value_type(value)))?;
            if required && text.trim().is_empty() {
                return Err(ValidationError::Blank {
                    field: path.to_string(),
                });
            }
            Ok(value.clone())
        }
        ArgumentType::Integer { minimum, maximum } => {
            let number = value
                .as_i64()
                .ok_or_else(|| ValidationError::invalid_type(path, "integer", value_type(value)))?;
            let below = minimum.is_some_and(|min| number < min);
            let above = maximum.is_some_and(|max| number > max);
            if below || above {
                return Err(ValidationError::OutOfRange {
                    field: path.to_string(),
                    value: number,
                    bounds: describe_bounds(*minimum, *maximum),
                });
            }
            Ok(value.clone())
        }
        ArgumentType::Boolean => {
            if !value.is_boolean() {
                return Err(ValidationError::invalid_type(
                    path,
                    "boolean",
                    value_type(value),
                ));
            }
            Ok(value.clone())
        }
        ArgumentType::DateTime => {
            let text = value
                .as_str()
                .ok_or_else(|| ValidationError::invalid_type(path, "date-time", value_type(value)))?;
            DateTime::parse_from_rfc3339(text).map_err(|_| ValidationError::InvalidDateTime {
                field: path.to_string(),
                value: text.to_string(),
            })?;
            Ok(value.clone())
        }
        ArgumentType::Enum(variants) => {
            let label = value
                .as_str()
                .ok_or_else(|| ValidationError::invalid_type(path, "string", value_type(value)))?;
            if !variants.iter().any(|variant| variant.label == label) {
                return Err(ValidationError::InvalidEnumValue {
                    field: path.to_string(),
                    value: label.to_string(),
                    allowed: variants.iter().map(|v| v.label.clone()).collect(),
                });
            }
            Ok(value.clone())
        }
        ArgumentType::Object(fields) => {
            let object = value
                .as_object()
                .ok_or_else(|| ValidationError::invalid_type(path, "object", value_type(value)))?;
            let values = validate_fields(path, fields, object)?;
            Ok(Value::Object(values.into_iter().collect()))
        }
        ArgumentType::Array(items) => {
            let array = value
                .as_array()
                .ok_or_else(|| ValidationError::invalid_type(path, "array", value_type(value)))?;
            array
                .iter()
                .enumerate()
                .map(|(index, item)| check_value(&format!("{path}[{index}]"), items, true, item))
                .collect::<ValidationResult<Vec<_>>>()
                .map(Value::Array)
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn describe_bounds(minimum: Option<i64>, maximum: Option<i64>) -> String {
    match (minimum, maximum) {
        (Some(min), Some(max)) => format!("expected {min}..={max}"),
        (Some(min), None) => format!("expected >= {min}"),
        (None, Some(max)) => format!("expected <= {max}"),
        (None, None) => "unbounded".to_string(),
    }
}

/// Get the type name of a JSON value for error messages.
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
