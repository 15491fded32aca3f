//! Dispatcher behaviour for single-call operations.

use crate::common::{ScriptedTransport, dispatcher, ok, status};
use freshservice_mcp::ErrorKind;
use freshservice_mcp::dispatcher::InvocationRequest;
use freshservice_mcp::upstream::{HttpMethod, UpstreamResponse};
use serde_json::{Value, json};

#[tokio::test]
async fn test_unknown_operation_makes_no_calls() {
    let dispatcher = dispatcher(ScriptedTransport::new());

    let envelope = dispatcher.invoke("delete_all_tickets", json!({})).await;

    let error = envelope.as_error().expect("should fail");
    assert_eq!(error.kind, ErrorKind::UnknownOperation);
    assert!(!error.retriable);
    assert_eq!(dispatcher.client().transport().call_count(), 0);
}

#[tokio::test]
async fn test_missing_required_argument_makes_no_calls() {
    let transport = ScriptedTransport::new().on("/tickets/1", ok(json!({"ticket": {"id": 1}})));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("get_ticket", json!({})).await;

    let error = envelope.as_error().expect("should fail");
    assert_eq!(error.kind, ErrorKind::InvalidArgument);
    assert_eq!(error.details, Some(json!({"field": "ticket_id"})));
    assert_eq!(dispatcher.client().transport().call_count(), 0);
}

#[tokio::test]
async fn test_invalid_enum_and_unknown_field_rejected_locally() {
    let dispatcher = dispatcher(ScriptedTransport::new());

    let bad_enum = dispatcher
        .invoke("filter_tickets", json!({"status": "exploded"}))
        .await;
    assert_eq!(bad_enum.as_error().unwrap().kind, ErrorKind::InvalidArgument);

    let unknown = dispatcher
        .invoke("get_ticket", json!({"ticket_id": 1, "verbose": true}))
        .await;
    let error = unknown.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::InvalidArgument);
    assert_eq!(error.details, Some(json!({"field": "verbose"})));

    assert_eq!(dispatcher.client().transport().call_count(), 0);
}

#[tokio::test]
async fn test_get_ticket_projects_fields_and_authenticates() {
    let transport = ScriptedTransport::new().on(
        "/tickets/42",
        ok(json!({
            "ticket": {
                "id": 42,
                "subject": "Printer on fire",
                "status": 2,
                "priority": 4,
                "internal_score": 0.93
            }
        })),
    );
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .dispatch(InvocationRequest::new("get_ticket", json!({"ticket_id": 42})).with_request_id("req-1"))
        .await;

    let result = envelope.as_result().expect("should succeed");
    assert_eq!(result.data["id"], 42);
    assert_eq!(result.data["subject"], "Printer on fire");
    assert_eq!(result.data["priority"], 4);
    assert_eq!(result.data["due_by"], Value::Null);
    assert!(result.data.get("internal_score").is_none());
    assert_eq!(result.metadata.request_id, "req-1");
    assert_eq!(result.metadata.operation, "get_ticket");

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, HttpMethod::Get);
    assert_eq!(calls[0].header("authorization"), Some("Basic dGVzdC1hcGkta2V5Olg="));
    assert_eq!(calls[0].header("accept"), Some("application/json"));
    assert!(calls[0].body.is_none());
}

#[tokio::test]
async fn test_create_change_sub_object_round_trip() {
    let planning = json!({
        "reason_for_change": {"description": "<p>Expiring certificate</p>"},
        "rollout_plan": {"description": "<p>Rotate at 02:00</p>"}
    });
    let transport = ScriptedTransport::new().on(
        "/changes",
        UpstreamResponse::new(
            201,
            json!({
                "change": {
                    "id": 7,
                    "subject": "Rotate TLS certificate",
                    "status": 1,
                    "risk": 3,
                    "planning_fields": planning.clone()
                }
            }),
        ),
    );
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke(
            "create_change",
            json!({
                "requester_id": 5,
                "subject": "Rotate TLS certificate",
                "description": "<p>Yearly rotation</p>",
                "risk": "high",
                "planned_start_date": "2025-03-01T02:00:00Z",
                "planned_end_date": "2025-03-01T04:00:00+00:00",
                "planning_fields": planning.clone()
            }),
        )
        .await;

    let result = envelope.as_result().expect("should succeed");
    assert_eq!(result.data["id"], 7);
    assert_eq!(result.data["planning_fields"], planning);

    let calls = dispatcher.client().transport().calls();
    let body = calls[0].body.as_ref().expect("POST carries a body");
    assert_eq!(calls[0].method, HttpMethod::Post);
    assert_eq!(body["planning_fields"], planning);
    assert_eq!(body["risk"], 3);
    assert_eq!(body["status"], 1);
    assert_eq!(body["change_type"], 2);
    assert_eq!(body["impact"], 1);
    assert_eq!(calls[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_invalid_date_time_names_the_field() {
    let dispatcher = dispatcher(ScriptedTransport::new());

    let envelope = dispatcher
        .invoke(
            "create_change",
            json!({
                "requester_id": 5,
                "subject": "Rotate",
                "description": "x",
                "planned_start_date": "2025-03-01T02:00:00Z",
                "planned_end_date": "tomorrow",
            }),
        )
        .await;

    let error = envelope.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::InvalidArgument);
    assert_eq!(error.details, Some(json!({"field": "planned_end_date"})));
}

#[tokio::test]
async fn test_status_mapping() {
    let transport = ScriptedTransport::new()
        .on("/tickets/1", status(401))
        .on("/tickets/2", UpstreamResponse::new(404, json!({"message": "Record not found"})))
        .on(
            "/tickets/3",
            UpstreamResponse::new(
                400,
                json!({
                    "description": "Validation failed",
                    "errors": [{"field": "priority", "message": "It should be one of these values: '1,2,3,4'"}]
                }),
            ),
        );
    let dispatcher = dispatcher(transport);

    let unauthorized = dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;
    let error = unauthorized.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::UpstreamUnauthorized);
    assert!(!error.retriable);

    let missing = dispatcher.invoke("get_ticket", json!({"ticket_id": 2})).await;
    let error = missing.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::UpstreamNotFound);
    assert_eq!(
        error.details,
        Some(json!({"status": 404, "upstream_body": {"message": "Record not found"}}))
    );

    let rejected = dispatcher.invoke("get_ticket", json!({"ticket_id": 3})).await;
    let error = rejected.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::UpstreamRejected);
    assert!(error.message.contains("priority: It should be one of these values"));

    // Client errors are never retried.
    assert_eq!(dispatcher.client().transport().call_count(), 3);
}

#[tokio::test]
async fn test_unexpected_body_is_invalid_response() {
    let transport = ScriptedTransport::new().on("/tickets/9", ok(json!("<html>maintenance</html>")));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 9})).await;
    assert_eq!(envelope.as_error().unwrap().kind, ErrorKind::InvalidResponse);
}

#[tokio::test]
async fn test_first_match_returns_single_entity() {
    let transport = ScriptedTransport::new().on(
        "/departments",
        ok(json!({"departments": [
            {"id": 3, "name": "Finance"},
            {"id": 4, "name": "Finance EMEA"}
        ]})),
    );
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("get_department_by_name", json!({"name": "Finance"}))
        .await;

    let result = envelope.as_result().unwrap();
    assert_eq!(result.data["id"], 3);
    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls[0].query_value("query"), Some("\"name:'Finance'\""));
}

#[tokio::test]
async fn test_first_match_without_match_is_not_found() {
    let transport = ScriptedTransport::new().on("/departments", ok(json!({"departments": []})));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("get_department_by_name", json!({"name": "Nowhere"}))
        .await;
    assert_eq!(envelope.as_error().unwrap().kind, ErrorKind::UpstreamNotFound);
}

#[tokio::test]
async fn test_solutions_keep_published_articles_only() {
    let transport = ScriptedTransport::new().on(
        "/solutions/articles/search",
        ok(json!({"articles": [
            {"id": 1, "title": "Reset VPN", "status": 2},
            {"id": 2, "title": "Draft", "status": 1},
            {"id": 3, "title": "Reset MFA", "status": 2}
        ]})),
    );
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("search_solutions", json!({"search_term": "reset"}))
        .await;

    let result = envelope.as_result().unwrap();
    let ids: Vec<&Value> = result.data.as_array().unwrap().iter().map(|a| &a["id"]).collect();
    assert_eq!(ids, vec![&json!(1), &json!(3)]);
    assert_eq!(result.metadata.item_count, Some(2));
    assert_eq!(
        result.data[1]["url"],
        "https://acme.freshservice.com/support/solutions/articles/3"
    );

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 1, "short page ends the walk");
    assert_eq!(calls[0].query_value("search_term"), Some("reset"));
}
