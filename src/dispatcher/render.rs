//! Rendering validated arguments into an upstream request.

use crate::catalog::{
    ArgumentLocation, ArgumentSpec, ArgumentType, OperationDescriptor, ValidatedArguments,
};
use crate::error::{AdapterResult, ValidationError};
use crate::upstream::UpstreamRequest;
use serde_json::{Map, Value};

/// Build the upstream request for `descriptor` from validated arguments.
///
/// Path placeholders are substituted and percent-encoded, filter clauses are joined
/// with `AND` into the endpoint's filter parameter, and enumerated labels are
/// replaced by their wire values. Control arguments are not rendered.
pub fn render_request(
    descriptor: &OperationDescriptor,
    args: &ValidatedArguments,
) -> AdapterResult<UpstreamRequest> {
    let endpoint = &descriptor.endpoint;

    let mut path = endpoint.path.clone();
    for placeholder in endpoint.placeholders() {
        let value = args
            .get(placeholder)
            .ok_or_else(|| ValidationError::missing_required(placeholder))?;
        let rendered = scalar_text(value);
        path = path.replace(
            &format!("{{{placeholder}}}"),
            &urlencoding::encode(&rendered),
        );
    }

    let mut request = UpstreamRequest::new(endpoint.method, path);
    let mut clauses = Vec::new();
    let mut body = Map::new();

    for spec in &descriptor.arguments {
        let Some(value) = args.get(&spec.name) else {
            continue;
        };
        match &spec.location {
            ArgumentLocation::Path | ArgumentLocation::Control => {}
            ArgumentLocation::Query { param } => {
                request.set_query(param.as_str(), scalar_text(&to_wire(&spec.arg_type, value)));
            }
            ArgumentLocation::Body { field } => {
                body.insert(field.clone(), to_wire(&spec.arg_type, value));
            }
            ArgumentLocation::Filter { field } => {
                clauses.push(filter_clause(field, &to_wire(&spec.arg_type, value)));
            }
            ArgumentLocation::FilterExpression => {
                if let Some(expression) = value.as_str() {
                    clauses.push(expression.trim().to_string());
                }
            }
        }
    }

    if !clauses.is_empty() {
        request.set_query(
            endpoint.filter_param.as_str(),
            format!("\"{}\"", clauses.join(" AND ")),
        );
    }
    if endpoint.method.has_body() {
        request.body = Some(Value::Object(body));
    }

    Ok(request)
}

/// Replace enumerated labels by their wire values, recursing into sub-schemas.
pub fn to_wire(arg_type: &ArgumentType, value: &Value) -> Value {
    match (arg_type, value) {
        (ArgumentType::Enum(variants), Value::String(label)) => variants
            .iter()
            .find(|variant| &variant.label == label)
            .map(|variant| variant.wire.clone())
            .unwrap_or_else(|| value.clone()),
        (ArgumentType::Object(fields), Value::Object(object)) => Value::Object(
            object
                .iter()
                .map(|(name, nested)| {
                    let wire = fields
                        .iter()
                        .find(|spec: &&ArgumentSpec| &spec.name == name)
                        .map(|spec| to_wire(&spec.arg_type, nested))
                        .unwrap_or_else(|| nested.clone());
                    (name.clone(), wire)
                })
                .collect(),
        ),
        (ArgumentType::Array(items), Value::Array(array)) => {
            Value::Array(array.iter().map(|item| to_wire(items, item)).collect())
        }
        _ => value.clone(),
    }
}

/// `field:value`, with strings single-quoted.
fn filter_clause(field: &str, value: &Value) -> String {
    match value {
        Value::String(text) => format!("{field}:'{}'", text.trim().replace('\'', "\\'")),
        other => format!("{field}:{}", scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
