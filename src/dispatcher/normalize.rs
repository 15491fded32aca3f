//! Response normalization.
//!
//! Maps non-success upstream responses onto [`AdapterError`] kinds, unwraps the
//! response envelope, and projects entities onto their declared fields.

use crate::catalog::{PortalLink, ResponseShape};
use crate::error::{AdapterError, AdapterResult};
use crate::upstream::UpstreamResponse;
use serde_json::{Map, Value};

/// Classify a non-success response that was not retried.
pub fn status_error(response: &UpstreamResponse) -> AdapterError {
    let message = response.error_message();
    let body = Some(response.body.clone()).filter(|body| !body.is_null());
    match response.status {
        401 | 403 => AdapterError::UpstreamUnauthorized {
            status: response.status,
            message,
            body,
        },
        404 => AdapterError::UpstreamNotFound { message, body },
        429 => AdapterError::UpstreamRateLimited {
            attempts: 1,
            retry_after: response.retry_after(),
        },
        status if status >= 500 => AdapterError::UpstreamServerError {
            status,
            attempts: 1,
            retriable: true,
            body,
        },
        status => AdapterError::UpstreamRejected {
            status,
            message,
            body,
        },
    }
}

/// The collection carried by a list response.
pub fn extract_items(shape: &ResponseShape, body: &Value) -> AdapterResult<Vec<Value>> {
    let payload = unwrap_envelope(shape, body)?;
    payload.as_array().cloned().ok_or_else(|| {
        AdapterError::invalid_response(format!(
            "expected a collection{}",
            describe_key(shape)
        ))
    })
}

/// The single entity carried by a response.
pub fn extract_entity(shape: &ResponseShape, body: &Value) -> AdapterResult<Value> {
    let payload = unwrap_envelope(shape, body)?;
    if !payload.is_object() {
        return Err(AdapterError::invalid_response(format!(
            "expected an object{}",
            describe_key(shape)
        )));
    }
    Ok(payload.clone())
}

/// Apply the collection filter, then project each retained item.
///
/// `portal` is the helpdesk base URL that portal links are built on.
pub fn relay_items(shape: &ResponseShape, portal: &str, items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| retained(shape, item))
        .map(|item| project(shape, portal, &item))
        .collect()
}

/// Whether an item passes the shape's collection filter.
pub fn retained(shape: &ResponseShape, item: &Value) -> bool {
    match &shape.retain {
        Some(rule) => item.get(&rule.field) == Some(&rule.equals),
        None => true,
    }
}

/// Keep only declared fields, then add portal links.
///
/// Absent fields are relayed as `null`, as are links whose placeholders the entity
/// cannot fill.
pub fn project(shape: &ResponseShape, portal: &str, entity: &Value) -> Value {
    let Some(object) = entity.as_object() else {
        return entity.clone();
    };
    let mut projected: Map<String, Value> = if shape.fields.is_empty() {
        object.clone()
    } else {
        shape
            .fields
            .iter()
            .map(|field| {
                (
                    field.name.clone(),
                    object.get(&field.name).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    };
    for link in &shape.links {
        projected.insert(link.field.clone(), portal_url(portal, link, object));
    }
    Value::Object(projected)
}

fn portal_url(portal: &str, link: &PortalLink, object: &Map<String, Value>) -> Value {
    let mut path = link.path.clone();
    for name in link.placeholders() {
        let text = match object.get(name) {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => return Value::Null,
        };
        path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(&text));
    }
    Value::String(format!("{}{path}", portal.trim_end_matches('/')))
}

fn unwrap_envelope<'a>(shape: &ResponseShape, body: &'a Value) -> AdapterResult<&'a Value> {
    match &shape.envelope_key {
        Some(key) => body.get(key).ok_or_else(|| {
            AdapterError::invalid_response(format!("response body lacks '{key}'"))
        }),
        None => Ok(body),
    }
}

fn describe_key(shape: &ResponseShape) -> String {
    shape
        .envelope_key
        .as_ref()
        .map(|key| format!(" under '{key}'"))
        .unwrap_or_default()
}
