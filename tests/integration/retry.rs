//! Retry, backoff and deadline behaviour of the upstream client.
//!
//! Runs on a paused clock so backoff delays are asserted exactly without waiting.

use crate::common::{Reply, ScriptedTransport, dispatcher, dispatcher_with, ok, status, test_config};
use freshservice_mcp::ErrorKind;
use freshservice_mcp::dispatcher::InvocationRequest;
use freshservice_mcp::governor::Governor;
use freshservice_mcp::upstream::{
    HttpMethod, MAX_RETRY_AFTER, RetryPolicy, TransportError, UpstreamClient, UpstreamRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn ticket() -> serde_json::Value {
    json!({"ticket": {"id": 1, "subject": "Laptop won't boot"}})
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_then_success_backs_off() {
    let transport = ScriptedTransport::new()
        .on("/tickets/1", status(429))
        .on("/tickets/1", ok(ticket()));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;

    assert!(envelope.is_success());
    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 2);
    let gap = calls[1].started - calls[0].finished.unwrap();
    assert!(gap >= Duration::from_millis(400), "backoff was {gap:?}");
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_overrides_shorter_backoff() {
    let transport = ScriptedTransport::new()
        .on("/tickets/1", status(429).with_header("Retry-After", "3"))
        .on("/tickets/1", ok(ticket()));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;

    assert!(envelope.is_success());
    let calls = dispatcher.client().transport().calls();
    let gap = calls[1].started - calls[0].finished.unwrap();
    assert!(gap >= Duration::from_secs(3), "waited only {gap:?}");
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_exhaust_attempt_cap() {
    let transport = ScriptedTransport::new().on("/tickets/1", status(500));
    let mut config = test_config();
    config.max_attempts = 3;
    let dispatcher = dispatcher_with(config, transport);

    let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;

    let error = envelope.as_error().expect("should fail");
    assert_eq!(error.kind, ErrorKind::UpstreamServerError);
    assert!(!error.retriable, "exhausted retries are terminal");
    assert!(error.message.contains("after 3 attempt(s)"));
    assert_eq!(error.details.as_ref().unwrap()["status"], 500);
    assert_eq!(dispatcher.client().transport().call_count(), 3);
    assert_eq!(dispatcher.client().attempts_made(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_stays_retriable() {
    let transport = ScriptedTransport::new().on("/departments/4", status(429));
    let mut config = test_config();
    config.max_attempts = 2;
    let dispatcher = dispatcher_with(config, transport);

    let envelope = dispatcher
        .invoke("get_department_by_id", json!({"department_id": 4}))
        .await;

    let error = envelope.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::UpstreamRateLimited);
    assert!(error.retriable);
    assert_eq!(dispatcher.client().transport().call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failures_are_retried() {
    let transport = ScriptedTransport::new()
        .on("/assets/12", Reply::Fail(TransportError::Connect("connection reset".into())))
        .on("/assets/12", ok(json!({"asset": {"id": 3, "display_id": 12}})));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("get_asset", json!({"display_id": 12})).await;

    assert_eq!(envelope.as_result().unwrap().data["display_id"], 12);
    assert_eq!(dispatcher.client().transport().call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_transport_failure_is_terminal() {
    let transport = ScriptedTransport::new()
        .on("/assets/12", Reply::Fail(TransportError::Connect("no route to host".into())));
    let mut config = test_config();
    config.max_attempts = 2;
    let dispatcher = dispatcher_with(config, transport);

    let envelope = dispatcher.invoke("get_asset", json!({"display_id": 12})).await;

    let error = envelope.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::TransportFailure);
    assert!(!error.retriable);
    assert!(error.message.contains("no route to host"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cuts_retries_short() {
    let transport = ScriptedTransport::new().on("/tickets/1", status(503));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .dispatch(
            InvocationRequest::new("get_ticket", json!({"ticket_id": 1}))
                .with_timeout(Duration::from_secs(1)),
        )
        .await;

    let error = envelope.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::UpstreamServerError);
    assert!(error.retriable, "attempts remain, only time ran out");
    let calls = dispatcher.client().transport().call_count();
    assert!((1..5).contains(&calls), "made {calls} calls");
}

#[tokio::test(start_paused = true)]
async fn test_slow_upstream_exceeds_deadline() {
    let transport = ScriptedTransport::new()
        .with_latency(Duration::from_secs(10))
        .on("/tickets/1", ok(ticket()));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .dispatch(
            InvocationRequest::new("get_ticket", json!({"ticket_id": 1}))
                .with_timeout(Duration::from_secs(2)),
        )
        .await;

    let error = envelope.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::DeadlineExceeded);
    assert!(error.retriable);

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].finished.is_none(), "in-flight call is abandoned");
    assert_eq!(dispatcher.client().governor().available_permits(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_retry_after_is_clamped_not_fatal() {
    let transport = ScriptedTransport::new().on(
        "/tickets/1",
        status(429).with_header("Retry-After", "18446744073709551615"),
    );
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;

    let error = envelope.as_error().expect("should fail without panicking");
    assert_eq!(error.kind, ErrorKind::UpstreamRateLimited);
    assert!(error.retriable);
    assert_eq!(dispatcher.client().transport().call_count(), 1);

    let blocked = dispatcher.client().governor().snapshot().blocked_for;
    assert!(blocked.is_some_and(|wait| wait <= MAX_RETRY_AFTER));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_timeouts_saturate() {
    let transport = ScriptedTransport::new().on("/tickets/1", ok(ticket()));
    let mut config = test_config();
    config.invocation_timeout = Duration::from_secs(u64::MAX);
    let dispatcher = dispatcher_with(config, transport);

    let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 1})).await;
    assert!(envelope.is_success());

    let envelope = dispatcher
        .dispatch(
            InvocationRequest::new("get_ticket", json!({"ticket_id": 1}))
                .with_timeout(Duration::MAX),
        )
        .await;
    assert!(envelope.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_client_with_custom_retry_policy() {
    let transport = ScriptedTransport::new()
        .on("/tickets/1", status(503))
        .on("/tickets/1", ok(ticket()));
    let client = UpstreamClient::new(transport, &test_config(), Arc::new(Governor::default()))
        .with_retry_policy(
            RetryPolicy::default()
                .with_base_delay(Duration::from_secs(2))
                .without_jitter(),
        );

    let response = client
        .execute(
            UpstreamRequest::new(HttpMethod::Get, "/tickets/1"),
            Instant::now() + Duration::from_secs(30),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    let calls = client.transport().calls();
    assert_eq!(calls.len(), 2);
    let gap = calls[1].started - calls[0].finished.unwrap();
    assert!(gap >= Duration::from_secs(2) && gap < Duration::from_secs(3), "waited {gap:?}");
}
