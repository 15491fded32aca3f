//! Argument validation properties over the built-in catalog.
//!
//! - `properties` - proptest generators over ids, names and argument shapes


use crate::common::{ScriptedTransport, dispatcher};
use freshservice_mcp::ErrorKind;
use serde_json::json;

#[tokio::test]
async fn test_every_required_argument_is_checked_before_any_call() {
    let dispatcher = dispatcher(ScriptedTransport::new());
    let operations: Vec<_> = dispatcher
        .list_operations()
        .iter()
        .filter(|op| op.required_arguments().next().is_some())
        .map(|op| op.name.clone())
        .collect();
    assert!(operations.len() > 10);

    for name in &operations {
        let envelope = dispatcher.invoke(name, json!({})).await;
        let error = envelope
            .as_error()
            .unwrap_or_else(|| panic!("{name} accepted empty arguments"));
        assert_eq!(error.kind, ErrorKind::InvalidArgument, "{name}");
    }
    assert_eq!(dispatcher.client().transport().call_count(), 0);
}

#[tokio::test]
async fn test_at_least_one_of_constraint() {
    let dispatcher = dispatcher(ScriptedTransport::new());

    let envelope = dispatcher.invoke("search_requesters_by_name", json!({})).await;
    let error = envelope.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::InvalidArgument);
    assert!(error.message.contains("first_name"));
    assert!(error.details.is_none());

    let envelope = dispatcher
        .invoke(
            "create_ticket",
            json!({"subject": "No requester", "description": "<p>?</p>"}),
        )
        .await;
    assert_eq!(envelope.as_error().unwrap().kind, ErrorKind::InvalidArgument);
    assert_eq!(dispatcher.client().transport().call_count(), 0);
}

#[tokio::test]
async fn test_array_items_are_validated() {
    let dispatcher = dispatcher(ScriptedTransport::new());

    let envelope = dispatcher
        .invoke(
            "create_ticket",
            json!({
                "subject": "Broken dock",
                "description": "<p>Dock flickers</p>",
                "email": "ada@example.com",
                "assets": [{"display_id": 3}, {"display_id": "three"}]
            }),
        )
        .await;

    let error = envelope.as_error().unwrap();
    assert_eq!(error.details, Some(json!({"field": "assets[1].display_id"})));
}
