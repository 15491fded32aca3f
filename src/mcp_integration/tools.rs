//! Tool definitions rendered from catalog descriptors.
//!
//! Each operation becomes one MCP tool whose `inputSchema` is derived from its
//! argument specs, so validation and discovery never drift apart.

use crate::catalog::{
    ArgumentConstraint, ArgumentSpec, ArgumentType, OperationDescriptor,
};
use serde_json::{Map, Value, json};

/// Full tool definition for `tools/list`.
pub fn tool_definition(descriptor: &OperationDescriptor) -> Value {
    let mut input_schema = object_schema(&descriptor.arguments);

    let groups: Vec<Value> = descriptor
        .constraints
        .iter()
        .map(|constraint| match constraint {
            ArgumentConstraint::AtLeastOneOf(names) => json!({
                "anyOf": names
                    .iter()
                    .map(|name| json!({"required": [name]}))
                    .collect::<Vec<_>>()
            }),
        })
        .collect();
    if let (Some(object), false) = (input_schema.as_object_mut(), groups.is_empty()) {
        object.insert("allOf".into(), Value::Array(groups));
    }

    json!({
        "name": descriptor.name,
        "description": descriptor.description,
        "inputSchema": input_schema
    })
}

/// JSON schema of a closed object with the given fields.
fn object_schema(fields: &[ArgumentSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in fields {
        properties.insert(spec.name.clone(), argument_schema(spec));
        if spec.required && spec.default.is_none() {
            required.push(Value::String(spec.name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn argument_schema(spec: &ArgumentSpec) -> Value {
    let mut schema = type_schema(&spec.arg_type);
    if let Some(object) = schema.as_object_mut() {
        if !spec.description.is_empty() {
            object.insert("description".into(), json!(spec.description));
        }
        if let Some(default) = &spec.default {
            object.insert("default".into(), default.clone());
        }
    }
    schema
}

fn type_schema(arg_type: &ArgumentType) -> Value {
    match arg_type {
        ArgumentType::String => json!({"type": "string"}),
        ArgumentType::Boolean => json!({"type": "boolean"}),
        ArgumentType::DateTime => json!({"type": "string", "format": "date-time"}),
        ArgumentType::Integer { minimum, maximum } => {
            let mut schema = Map::new();
            schema.insert("type".into(), json!("integer"));
            if let Some(minimum) = minimum {
                schema.insert("minimum".into(), json!(minimum));
            }
            if let Some(maximum) = maximum {
                schema.insert("maximum".into(), json!(maximum));
            }
            Value::Object(schema)
        }
        ArgumentType::Enum(variants) => json!({
            "type": "string",
            "enum": variants.iter().map(|v| v.label.as_str()).collect::<Vec<_>>()
        }),
        ArgumentType::Object(fields) => object_schema(fields),
        ArgumentType::Array(items) => json!({
            "type": "array",
            "items": type_schema(items)
        }),
    }
}
