//! Governor limits across concurrent invocations, and fan-out.

use crate::common::{RecordedCall, ScriptedTransport, dispatcher, dispatcher_with, ok, status, test_config};
use freshservice_mcp::ErrorKind;
use freshservice_mcp::dispatcher::InvocationRequest;
use serde_json::json;
use std::time::Duration;

fn overlaps(a: &RecordedCall, b: &RecordedCall) -> bool {
    let (a_end, b_end) = (a.finished.unwrap(), b.finished.unwrap());
    a.started < b_end && b.started < a_end
}

fn requester(department_ids: &[u64]) -> serde_json::Value {
    json!({"requester": {
        "id": 77,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "department_ids": department_ids
    }})
}

fn department(id: u64, name: &str) -> serde_json::Value {
    json!({"department": {"id": id, "name": name}})
}

#[tokio::test(start_paused = true)]
async fn test_pool_of_one_serializes_invocations() {
    let transport = ScriptedTransport::new()
        .with_latency(Duration::from_millis(100))
        .on("/tickets/1", ok(json!({"ticket": {"id": 1}})))
        .on("/tickets/2", ok(json!({"ticket": {"id": 2}})));
    let mut config = test_config();
    config.max_concurrent_requests = 1;
    let dispatcher = dispatcher_with(config, transport);

    let (first, second) = tokio::join!(
        dispatcher.invoke("get_ticket", json!({"ticket_id": 1})),
        dispatcher.invoke("get_ticket", json!({"ticket_id": 2})),
    );

    assert!(first.is_success());
    assert!(second.is_success());
    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 2);
    assert!(!overlaps(&calls[0], &calls[1]), "calls overlapped: {calls:?}");
}

#[tokio::test(start_paused = true)]
async fn test_larger_pool_allows_overlap() {
    let transport = ScriptedTransport::new()
        .with_latency(Duration::from_millis(100))
        .on("/tickets/1", ok(json!({"ticket": {"id": 1}})))
        .on("/tickets/2", ok(json!({"ticket": {"id": 2}})));
    let dispatcher = dispatcher(transport);

    tokio::join!(
        dispatcher.invoke("get_ticket", json!({"ticket_id": 1})),
        dispatcher.invoke("get_ticket", json!({"ticket_id": 2})),
    );

    let calls = dispatcher.client().transport().calls();
    assert!(overlaps(&calls[0], &calls[1]));
}

#[tokio::test(start_paused = true)]
async fn test_waiting_past_deadline_is_governor_timeout() {
    let transport = ScriptedTransport::new()
        .with_latency(Duration::from_secs(5))
        .on("/tickets/1", ok(json!({"ticket": {"id": 1}})));
    let mut config = test_config();
    config.max_concurrent_requests = 1;
    let dispatcher = dispatcher_with(config, transport);

    let (slow, starved) = tokio::join!(
        dispatcher.invoke("get_ticket", json!({"ticket_id": 1})),
        dispatcher.dispatch(
            InvocationRequest::new("get_ticket", json!({"ticket_id": 1}))
                .with_timeout(Duration::from_secs(1))
        ),
    );

    assert!(slow.is_success());
    let error = starved.as_error().expect("second invocation starves");
    assert_eq!(error.kind, ErrorKind::GovernorTimeout);
    assert!(error.retriable);
    assert_eq!(dispatcher.client().transport().call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_upstream_budget_paces_next_request() {
    let transport = ScriptedTransport::new()
        .on(
            "/tickets/1",
            ok(json!({"ticket": {"id": 1}}))
                .with_header("X-Ratelimit-Total", "60")
                .with_header("X-Ratelimit-Remaining", "0"),
        );
    let mut config = test_config();
    config.rate_limit_per_minute = 60;
    let dispatcher = dispatcher_with(config, transport);

    dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;
    dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;

    let calls = dispatcher.client().transport().calls();
    let gap = calls[1].started - calls[0].finished.unwrap();
    assert!(gap >= Duration::from_millis(990), "paced only {gap:?}");

    let snapshot = dispatcher.client().governor().snapshot();
    assert_eq!(snapshot.upstream_total, Some(60));
    assert_eq!(snapshot.upstream_remaining, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_resolves_departments_in_parallel() {
    let transport = ScriptedTransport::new()
        .with_latency(Duration::from_millis(50))
        .on("/requesters/77", ok(requester(&[1, 2, 3])))
        .on("/departments/1", ok(department(1, "Finance")))
        .on("/departments/2", ok(department(2, "Legal")))
        .on("/departments/3", ok(department(3, "IT")));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("get_requester_by_id", json!({"requester_id": 77}))
        .await;

    let result = envelope.as_result().expect("should succeed");
    assert_eq!(result.data["first_name"], "Ada");
    let names: Vec<&str> = result.data["departments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Finance", "Legal", "IT"]);

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].path, "/requesters/77");
    let lookups = &calls[1..];
    assert!(overlaps(&lookups[0], &lookups[1]));
    assert!(overlaps(&lookups[1], &lookups[2]));
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_reports_failed_lookup_in_place() {
    let transport = ScriptedTransport::new()
        .on("/requesters/77", ok(requester(&[1, 2])))
        .on("/departments/1", ok(department(1, "Finance")))
        .on("/departments/2", status(404));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("get_requester_by_id", json!({"requester_id": 77}))
        .await;

    let result = envelope.as_result().expect("primary result survives");
    let departments = result.data["departments"].as_array().unwrap();
    assert_eq!(departments[0]["name"], "Finance");
    assert_eq!(departments[1]["id"], 2);
    assert_eq!(departments[1]["error"]["kind"], "UPSTREAM_NOT_FOUND");
    assert_eq!(departments[1]["error"]["retriable"], false);
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_with_pool_of_one_never_overlaps() {
    let transport = ScriptedTransport::new()
        .with_latency(Duration::from_millis(50))
        .on("/requesters/77", ok(requester(&[1, 2, 3])))
        .on("/departments/1", ok(department(1, "Finance")))
        .on("/departments/2", ok(department(2, "Legal")))
        .on("/departments/3", ok(department(3, "IT")));
    let mut config = test_config();
    config.max_concurrent_requests = 1;
    let dispatcher = dispatcher_with(config, transport);

    let envelope = dispatcher
        .invoke("get_requester_by_id", json!({"requester_id": 77}))
        .await;

    assert!(envelope.is_success());
    let calls = dispatcher.client().transport().calls();
    for (i, a) in calls.iter().enumerate() {
        for b in &calls[i + 1..] {
            assert!(!overlaps(a, b));
        }
    }
}
