//! Page walks through the dispatcher and the walker directly.

use crate::common::{ScriptedTransport, dispatcher, dispatcher_with, ok, page, status, test_config};
use freshservice_mcp::ErrorKind;
use freshservice_mcp::catalog::{OperationDescriptor, validate_arguments};
use freshservice_mcp::dispatcher::render_request;
use freshservice_mcp::pagination::{PageWalker, collect_walk};
use freshservice_mcp::upstream::HttpMethod;
use futures::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::Instant;

fn ids(data: &Value) -> Vec<u64> {
    data.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_walks_three_pages_in_order() {
    let transport = ScriptedTransport::new()
        .on("/departments", page("departments", &[1, 2], true))
        .on("/departments", page("departments", &[3, 4], true))
        .on("/departments", page("departments", &[5, 6], false));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("list_departments", json!({})).await;

    let result = envelope.as_result().expect("walk should succeed");
    assert_eq!(ids(&result.data), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(result.metadata.item_count, Some(6));
    assert_eq!(result.metadata.pages_fetched, Some(3));
    assert!(!result.metadata.truncated);
    assert_eq!(result.next_page, None);

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 3);
    let pages: Vec<Option<&str>> = calls.iter().map(|c| c.query_value("page")).collect();
    assert_eq!(pages, vec![Some("1"), Some("2"), Some("3")]);
    assert!(calls.iter().all(|c| c.query_value("per_page") == Some("100")));
}

#[tokio::test]
async fn test_walk_stops_at_configured_page_cap() {
    let transport = ScriptedTransport::new().on("/departments", page("departments", &[1, 2], true));
    let mut config = test_config();
    config.max_pages = 2;
    let dispatcher = dispatcher_with(config, transport);

    let envelope = dispatcher.invoke("list_departments", json!({})).await;

    let result = envelope.as_result().unwrap();
    assert_eq!(result.data.as_array().unwrap().len(), 4);
    assert_eq!(result.metadata.pages_fetched, Some(2));
    assert!(result.metadata.truncated);
    assert_eq!(dispatcher.client().transport().call_count(), 2);
}

#[tokio::test]
async fn test_filter_tickets_capped_at_ten_full_pages() {
    let full: Vec<u64> = (1..=30).collect();
    let transport = ScriptedTransport::new().on("/tickets/filter", page("tickets", &full, false));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("filter_tickets", json!({"status": "open"}))
        .await;

    let result = envelope.as_result().unwrap();
    assert_eq!(result.metadata.item_count, Some(300));
    assert!(result.metadata.truncated);

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 10);
    assert_eq!(calls[0].query_value("per_page"), Some("30"));
    assert_eq!(calls[0].query_value("query"), Some("\"status:2\""));
}

#[tokio::test]
async fn test_short_page_ends_full_page_walk() {
    let full: Vec<u64> = (1..=30).collect();
    let transport = ScriptedTransport::new()
        .on("/tickets/filter", page("tickets", &full, false))
        .on("/tickets/filter", page("tickets", &[31, 32], false));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher
        .invoke("filter_tickets", json!({"priority": "urgent"}))
        .await;

    let result = envelope.as_result().unwrap();
    assert_eq!(result.metadata.item_count, Some(32));
    assert!(!result.metadata.truncated);
    assert_eq!(dispatcher.client().transport().call_count(), 2);
}

#[tokio::test]
async fn test_empty_batch_ends_walk_despite_next_link() {
    let transport = ScriptedTransport::new()
        .on("/departments", page("departments", &[1, 2], true))
        .on("/departments", page("departments", &[], true));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("list_departments", json!({})).await;

    let result = envelope.as_result().expect("walk should end cleanly");
    assert_eq!(ids(&result.data), vec![1, 2]);
    assert_eq!(result.metadata.pages_fetched, Some(2));
    assert!(!result.metadata.truncated);
    assert_eq!(dispatcher.client().transport().call_count(), 2);
}

#[tokio::test]
async fn test_single_page_mode_returns_next_page() {
    let transport = ScriptedTransport::new()
        .on("/assets", page("assets", &[21, 22], true))
        .on("/assets", page("assets", &[23], false));
    let dispatcher = dispatcher(transport);

    let first = dispatcher
        .invoke("list_assets", json!({"page": 2, "per_page": 2}))
        .await;
    let result = first.as_result().unwrap();
    assert_eq!(ids(&result.data), vec![21, 22]);
    assert_eq!(result.next_page, Some(3));
    assert_eq!(result.metadata.pages_fetched, Some(1));

    let last = dispatcher
        .invoke("list_assets", json!({"page": 3, "per_page": 2}))
        .await;
    assert_eq!(last.as_result().unwrap().next_page, None);

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].query_value("page"), Some("2"));
    assert_eq!(calls[0].query_value("per_page"), Some("2"));
    assert_eq!(calls[1].query_value("page"), Some("3"));
}

#[tokio::test]
async fn test_failed_page_reports_partial_items() {
    let transport = ScriptedTransport::new()
        .on("/changes", page("changes", &[1, 2], true))
        .on("/changes", status(403));
    let dispatcher = dispatcher(transport);

    let envelope = dispatcher.invoke("list_changes", json!({})).await;

    let error = envelope.as_error().expect("second page fails");
    assert_eq!(error.kind, ErrorKind::UpstreamUnauthorized);
    let details = error.details.as_ref().unwrap();
    assert_eq!(details["partial_item_count"], 2);
    assert_eq!(details["partial_items"][0]["id"], 1);
    assert_eq!(details["partial_items"][1]["id"], 2);
    assert_eq!(error.metadata.pages_fetched, Some(1));
}

#[tokio::test]
async fn test_walk_is_lazy() {
    let transport = ScriptedTransport::new().on("/departments", page("departments", &[1, 2], true));
    let dispatcher = dispatcher(transport);
    let descriptor = dispatcher.catalog().lookup("list_departments").unwrap();
    let args = validate_arguments(descriptor, &json!({})).unwrap();
    let base = render_request(descriptor, &args).unwrap();

    let walker = PageWalker::new(dispatcher.client(), 50);
    let mut walk = walker.walk(descriptor, base, None, Instant::now() + Duration::from_secs(5));

    let first = walk.next().await.unwrap().unwrap();
    assert_eq!(first["id"], 1);
    let second = walk.next().await.unwrap().unwrap();
    assert_eq!(second["id"], 2);
    assert_eq!(walk.pages_fetched(), 1);
    assert_eq!(dispatcher.client().transport().call_count(), 1);

    walk.next().await.unwrap().unwrap();
    assert_eq!(dispatcher.client().transport().call_count(), 2);
}

#[tokio::test]
async fn test_offset_limit_walk() {
    let descriptor = OperationDescriptor::builder("list_audit_log", HttpMethod::Get, "/audit_log")
        .description("Audit entries")
        .envelope("entries")
        .paginate_offset("offset", "limit", 2, None)
        .build();
    let transport = ScriptedTransport::new()
        .on("/audit_log", ok(json!({"entries": [{"id": 1}, {"id": 2}]})))
        .on("/audit_log", ok(json!({"entries": [{"id": 3}]})));
    let dispatcher = dispatcher(transport);

    let args = validate_arguments(&descriptor, &Value::Null).unwrap();
    let base = render_request(&descriptor, &args).unwrap();
    let walker = PageWalker::new(dispatcher.client(), 50);
    let mut walk = walker.walk(&descriptor, base, None, Instant::now() + Duration::from_secs(5));

    let items = collect_walk(&mut walk).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(walk.pages_fetched(), 2);

    let calls = dispatcher.client().transport().calls();
    assert_eq!(calls[0].query_value("offset"), Some("0"));
    assert_eq!(calls[0].query_value("limit"), Some("2"));
    assert_eq!(calls[1].query_value("offset"), Some("2"));
}
