// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn event(id: i64) -> Event {
    serde_json::from_value(json!({
        "id": id,
        "repo": "owner/repo",
        "event_type": "check_run",
        "action": "completed",
    }))
    .unwrap()
}

fn handler(name: &str) -> HandlerConfig {
    HandlerConfig {
        name: name.to_string(),
        event_type: "check_run".to_string(),
        action: "completed".to_string(),
        command: "echo".to_string(),
        filters: vec![],
        timeout: 300,
        enabled: true,
    }
}

#[tokio::test]
async fn fetch_pages_pop_in_order_then_empty() {
    let client = FakeCloudClient::new();
    client.push_fetch_page("owner/repo", vec![event(1), event(2)]);
    client.push_fetch_page("owner/repo", vec![event(3)]);
    client.connect().await.unwrap();

    let first = client.fetch_events_since("owner/repo", 0, 100).await.unwrap();
    assert_eq!(first.iter().map(|e| e.id).collect::<Vec<_>>(), [1, 2]);

    let second = client.fetch_events_since("owner/repo", 2, 100).await.unwrap();
    assert_eq!(second.iter().map(|e| e.id).collect::<Vec<_>>(), [3]);

    assert!(client
        .fetch_events_since("owner/repo", 3, 100)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn fetch_before_connect_fails() {
    let client = FakeCloudClient::new();
    assert!(matches!(
        client.fetch_events_since("owner/repo", 0, 100).await,
        Err(ConnectionError::NotConnected)
    ));
}

#[tokio::test]
async fn scripted_subscribe_failure_fires_channel_error() {
    let client = FakeCloudClient::new();
    client.connect().await.unwrap();
    client.fail_subscribes(1);

    let statuses: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let statuses_clone = Arc::clone(&statuses);
    let on_status: StatusCallback = Arc::new(move |status, _| {
        statuses_clone.lock().push(status.to_string());
    });
    let on_event: EventCallback = Arc::new(|_| {});

    client
        .subscribe(&["owner/repo".to_string()], Arc::clone(&on_event), Arc::clone(&on_status))
        .await
        .unwrap();
    assert_eq!(statuses.lock().as_slice(), ["CHANNEL_ERROR"]);

    // Budget consumed; the next subscribe is clean
    client.subscribe(&["owner/repo".to_string()], on_event, on_status).await.unwrap();
    assert_eq!(statuses.lock().len(), 1);
    assert_eq!(client.subscribe_count(), 2);
}

#[tokio::test]
async fn push_event_reaches_subscriber() {
    let client = FakeCloudClient::new();
    client.connect().await.unwrap();

    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let on_event: EventCallback = Arc::new(move |event| {
        seen_clone.lock().push(event.id);
    });
    let on_status: StatusCallback = Arc::new(|_, _| {});

    client
        .subscribe(&["owner/repo".to_string()], on_event, on_status)
        .await
        .unwrap();
    client.push_event(event(9));

    assert_eq!(seen.lock().as_slice(), [9]);
}

#[tokio::test]
async fn dispatcher_records_and_scripts_results() {
    let dispatcher = FakeDispatcher::new();
    dispatcher.script_result(
        "failing",
        HandlerResult {
            handler_name: "failing".to_string(),
            status: HandlerStatus::Failure,
            exit_code: Some(2),
            output: None,
            duration_seconds: Some(0.1),
        },
    );

    let ok = dispatcher.dispatch(&handler("ok"), &event(1)).await.unwrap();
    assert_eq!(ok.status, HandlerStatus::Success);

    let failed = dispatcher.dispatch(&handler("failing"), &event(2)).await.unwrap();
    assert_eq!(failed.status, HandlerStatus::Failure);
    assert_eq!(failed.exit_code, Some(2));

    assert_eq!(
        dispatcher.dispatched(),
        [("ok".to_string(), 1), ("failing".to_string(), 2)]
    );
}

#[tokio::test]
async fn dispatcher_scripted_error_raises() {
    let dispatcher = FakeDispatcher::new();
    dispatcher.fail_handler("broken", "spawn refused");

    let result = dispatcher.dispatch(&handler("broken"), &event(1)).await;
    assert!(matches!(result, Err(DispatchError::Spawn { .. })));
}
