// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{CloudConfig, RepoConfig};
use metarelay_core::{HandlerConfig, HandlerResult};
use metarelay_adapters::{CloudCall, FakeCloudClient, FakeDispatcher};
use metarelay_storage::SqliteEventStore;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

type TestSupervisor = Supervisor<FakeCloudClient, SqliteEventStore, FakeDispatcher>;

struct Harness {
    supervisor: Arc<TestSupervisor>,
    cloud: FakeCloudClient,
    dispatcher: FakeDispatcher,
    checkout: std::path::PathBuf,
    _tmp: TempDir,
}

fn harness(handlers: Vec<HandlerConfig>) -> Harness {
    let tmp = TempDir::new().unwrap();
    let checkout = tmp.path().join("checkout");

    let config = Config {
        cloud: CloudConfig {
            supabase_url: "https://test.supabase.co".to_string(),
            supabase_key: "test-key".to_string(),
            webhook_secret: None,
        },
        repos: vec![RepoConfig {
            name: "owner/repo".to_string(),
            path: checkout.display().to_string(),
        }],
        handlers: handlers.clone(),
        db_path: tmp.path().join("relay.db").display().to_string(),
        log_level: "INFO".to_string(),
    };

    let store = SqliteEventStore::open(tmp.path().join("relay.db")).unwrap();
    let cloud = FakeCloudClient::new();
    let dispatcher = FakeDispatcher::new();
    let registry = HandlerRegistry::new(handlers);

    Harness {
        supervisor: Arc::new(Supervisor::new(
            config,
            cloud.clone(),
            store,
            dispatcher.clone(),
            registry,
        )),
        cloud,
        dispatcher,
        checkout,
        _tmp: tmp,
    }
}

fn match_all_handler(name: &str) -> HandlerConfig {
    HandlerConfig {
        name: name.to_string(),
        event_type: "check_run".to_string(),
        action: "completed".to_string(),
        command: "echo {{repo}}".to_string(),
        filters: vec![],
        timeout: 300,
        enabled: true,
    }
}

fn event(id: i64) -> Event {
    serde_json::from_value(json!({
        "id": id,
        "repo": "owner/repo",
        "event_type": "check_run",
        "action": "completed",
        "payload": { "conclusion": "failure" },
    }))
    .unwrap()
}

fn cursor_for(supervisor: &TestSupervisor, repo: &str) -> Option<i64> {
    supervisor
        .store()
        .get_cursor(repo)
        .unwrap()
        .map(|c| c.last_event_id)
}

fn spawn_run(supervisor: &Arc<TestSupervisor>) -> JoinHandle<Result<(), SupervisorError>> {
    let supervisor = Arc::clone(supervisor);
    tokio::spawn(async move { supervisor.run().await })
}

fn subscribe_deltas(cloud: &FakeCloudClient) -> Vec<f64> {
    cloud
        .subscribe_times()
        .windows(2)
        .map(|w| (w[1] - w[0]).as_secs_f64())
        .collect()
}

// =============================================================================
// Catch-up
// =============================================================================

#[tokio::test]
async fn catch_up_dispatches_in_id_order() {
    let h = harness(vec![match_all_handler("all")]);
    h.cloud
        .push_fetch_page("owner/repo", vec![event(1), event(2), event(3)]);

    h.supervisor.run_sync().await.unwrap();

    assert_eq!(
        h.dispatcher.dispatched(),
        [
            ("all".to_string(), 1),
            ("all".to_string(), 2),
            ("all".to_string(), 3),
        ]
    );
    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), Some(3));

    // First page from 0, second fetch from the last delivered id
    let fetches: Vec<_> = h
        .cloud
        .calls()
        .into_iter()
        .filter(|c| matches!(c, CloudCall::Fetch { .. }))
        .collect();
    assert_eq!(
        fetches,
        [
            CloudCall::Fetch {
                repo: "owner/repo".to_string(),
                after_id: 0,
                limit: 100,
            },
            CloudCall::Fetch {
                repo: "owner/repo".to_string(),
                after_id: 3,
                limit: 100,
            },
        ]
    );
}

#[tokio::test]
async fn catch_up_resumes_from_stored_cursor() {
    let h = harness(vec![]);
    h.supervisor.store().set_cursor("owner/repo", 42).unwrap();

    h.supervisor.run_sync().await.unwrap();

    assert!(h.cloud.calls().contains(&CloudCall::Fetch {
        repo: "owner/repo".to_string(),
        after_id: 42,
        limit: 100,
    }));
}

#[tokio::test]
async fn run_sync_disconnects_and_stops() {
    let h = harness(vec![]);
    h.supervisor.run_sync().await.unwrap();

    assert_eq!(h.supervisor.status(), RelayStatus::Stopped);
    let calls = h.cloud.calls();
    assert_eq!(calls.first(), Some(&CloudCall::Connect));
    assert_eq!(calls.last(), Some(&CloudCall::Disconnect));
}

// =============================================================================
// Event-handling funnel
// =============================================================================

#[tokio::test]
async fn duplicate_event_dispatched_once_across_paths() {
    let h = harness(vec![match_all_handler("all")]);
    h.cloud.push_fetch_page("owner/repo", vec![event(1)]);

    // Catch-up delivers id=1, then the live path delivers it again
    h.supervisor.run_sync().await.unwrap();
    h.supervisor.handle_event(&event(1)).await.unwrap();

    assert_eq!(h.dispatcher.dispatched().len(), 1);
    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), Some(1));
}

#[tokio::test]
async fn filtered_out_event_still_advances_cursor() {
    let mut gated = match_all_handler("on-failure");
    gated.filters = vec!["payload.conclusion == 'failure'".to_string()];
    let h = harness(vec![gated]);

    let success_event: Event = serde_json::from_value(json!({
        "id": 9,
        "repo": "owner/repo",
        "event_type": "check_run",
        "action": "completed",
        "payload": { "conclusion": "success" },
    }))
    .unwrap();
    h.cloud.push_fetch_page("owner/repo", vec![success_event]);

    h.supervisor.run_sync().await.unwrap();

    assert!(h.dispatcher.dispatched().is_empty());
    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), Some(9));
}

#[tokio::test]
async fn unmatched_event_advances_cursor_without_log_entry() {
    let h = harness(vec![]);
    h.cloud.push_fetch_page("owner/repo", vec![event(5)]);

    h.supervisor.run_sync().await.unwrap();

    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), Some(5));
    // No dispatch, no log entry: the event stays eligible for a future
    // handler but is fenced off by the cursor
    assert!(!h.supervisor.store().has_event(5).unwrap());
}

#[tokio::test]
async fn matching_handlers_run_in_registration_order() {
    let h = harness(vec![match_all_handler("first"), match_all_handler("second")]);
    h.cloud.push_fetch_page("owner/repo", vec![event(1)]);

    h.supervisor.run_sync().await.unwrap();

    assert_eq!(
        h.dispatcher.dispatched(),
        [("first".to_string(), 1), ("second".to_string(), 1)]
    );
}

#[tokio::test]
async fn handler_failure_does_not_abort_later_events() {
    let h = harness(vec![match_all_handler("flaky")]);
    h.dispatcher.script_result(
        "flaky",
        HandlerResult {
            handler_name: "flaky".to_string(),
            status: HandlerStatus::Failure,
            exit_code: Some(1),
            output: Some("boom".to_string()),
            duration_seconds: Some(0.1),
        },
    );
    h.cloud.push_fetch_page("owner/repo", vec![event(1), event(2)]);

    h.supervisor.run_sync().await.unwrap();

    assert_eq!(h.dispatcher.dispatched().len(), 2);
    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), Some(2));
    assert!(h.supervisor.store().has_event(1).unwrap());
    assert!(h.supervisor.store().has_event(2).unwrap());
}

#[tokio::test]
async fn dispatch_error_fails_fast_without_advancing_cursor() {
    let h = harness(vec![match_all_handler("broken")]);
    h.dispatcher.fail_handler("broken", "spawn refused");
    h.cloud.push_fetch_page("owner/repo", vec![event(1), event(2)]);

    let result = h.supervisor.run_sync().await;

    assert!(matches!(result, Err(SupervisorError::Dispatch(_))));
    // Only the first event was attempted; the cursor stays behind so
    // the next run re-attempts it
    assert_eq!(h.dispatcher.dispatched().len(), 1);
    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), None);
}

#[tokio::test]
async fn store_failure_is_fatal() {
    let h = harness(vec![]);
    h.cloud.push_fetch_page("owner/repo", vec![event(1)]);
    h.supervisor.store().close().unwrap();

    let result = h.supervisor.run_sync().await;
    assert!(matches!(
        result,
        Err(SupervisorError::Store(EventStoreError::Closed))
    ));
}

#[tokio::test]
async fn event_file_written_to_configured_checkout() {
    let h = harness(vec![]);
    h.cloud.push_fetch_page("owner/repo", vec![event(1)]);

    h.supervisor.run_sync().await.unwrap();

    let event_file = h.checkout.join(".metarelay").join("events.jsonl");
    let contents = std::fs::read_to_string(event_file).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let written: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(written["id"], json!(1));
    assert_eq!(written["repo"], json!("owner/repo"));
}

#[tokio::test]
async fn event_file_appends_one_line_per_event() {
    let h = harness(vec![]);
    h.cloud
        .push_fetch_page("owner/repo", vec![event(1), event(2)]);

    h.supervisor.run_sync().await.unwrap();

    let event_file = h.checkout.join(".metarelay").join("events.jsonl");
    let contents = std::fs::read_to_string(event_file).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

// =============================================================================
// Reconnection loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn reconnect_backoff_doubles_between_failed_subscribes() {
    let h = harness(vec![]);
    // Three subscribes in a row lose the channel immediately; the
    // fourth stays up
    h.cloud.fail_subscribes(3);

    let task = spawn_run(&h.supervisor);
    h.cloud.wait_for_subscribes(4).await;
    h.supervisor.request_shutdown();
    task.await.unwrap().unwrap();

    assert_eq!(subscribe_deltas(&h.cloud), [1.0, 2.0, 4.0]);
}

#[tokio::test(start_paused = true)]
async fn backoff_resets_after_clean_subscribe() {
    let h = harness(vec![]);
    // First subscribe loses the channel immediately; the second returns
    // cleanly and only loses the channel afterwards
    h.cloud.fail_subscribes(1);

    let task = spawn_run(&h.supervisor);
    h.cloud.wait_for_subscribes(2).await;
    h.cloud.emit_status("CHANNEL_ERROR");
    h.cloud.wait_for_subscribes(3).await;
    h.supervisor.request_shutdown();
    task.await.unwrap().unwrap();

    // 1.0 before the second subscribe, and 1.0 again (reset, not 2.0)
    // before the third
    assert_eq!(subscribe_deltas(&h.cloud), [1.0, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn connect_error_reconnects_instead_of_dying() {
    let h = harness(vec![]);
    h.cloud.fail_connects(1);

    let task = spawn_run(&h.supervisor);
    h.cloud.wait_for_subscribes(1).await;
    h.supervisor.request_shutdown();
    task.await.unwrap().unwrap();

    let connects = h
        .cloud
        .calls()
        .iter()
        .filter(|c| matches!(c, CloudCall::Connect))
        .count();
    assert_eq!(connects, 2);
}

#[tokio::test(start_paused = true)]
async fn live_event_flows_through_the_funnel() {
    let h = harness(vec![match_all_handler("all")]);

    let task = spawn_run(&h.supervisor);
    h.cloud.wait_for_subscribes(1).await;
    assert_eq!(h.supervisor.status(), RelayStatus::Live);

    h.cloud.push_event(event(7));
    while !h.supervisor.store().has_event(7).unwrap() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    h.supervisor.request_shutdown();
    task.await.unwrap().unwrap();

    assert_eq!(h.dispatcher.dispatched(), [("all".to_string(), 7)]);
    assert_eq!(cursor_for(&h.supervisor, "owner/repo"), Some(7));
    assert_eq!(h.supervisor.status(), RelayStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn timed_out_status_also_triggers_reconnect() {
    let h = harness(vec![]);

    let task = spawn_run(&h.supervisor);
    h.cloud.wait_for_subscribes(1).await;
    h.cloud.emit_status("TIMED_OUT");
    h.cloud.wait_for_subscribes(2).await;
    h.supervisor.request_shutdown();
    task.await.unwrap().unwrap();

    assert_eq!(h.cloud.subscribe_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn benign_status_values_are_ignored() {
    let h = harness(vec![]);

    let task = spawn_run(&h.supervisor);
    h.cloud.wait_for_subscribes(1).await;
    h.cloud.emit_status("SUBSCRIBED");
    h.cloud.emit_status("system");
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Still on the first subscription
    assert_eq!(h.cloud.subscribe_count(), 1);
    h.supervisor.request_shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_before_run_exits_cleanly_without_connecting() {
    let h = harness(vec![]);
    h.supervisor.request_shutdown();

    h.supervisor.run().await.unwrap();

    assert_eq!(h.supervisor.status(), RelayStatus::Stopped);
    assert!(!h.cloud.calls().contains(&CloudCall::Connect));
}
