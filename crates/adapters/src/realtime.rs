// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel task: decodes push frames and forwards events
//!
//! The channel speaks the phoenix framing used by Supabase Realtime:
//! a `phx_join` frame opens the topic, periodic heartbeats keep the
//! socket alive, and `postgres_changes` frames carry inserted rows.
//! Status transitions are normalized to the strings the supervisor
//! understands (`SUBSCRIBED`, `CHANNEL_ERROR`, `TIMED_OUT`) before the
//! status callback fires.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use metarelay_core::{ConnectionError, Event, EventCallback, StatusCallback};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Realtime channel topic for the events table.
pub(crate) const EVENTS_TOPIC: &str = "realtime:public:events";

/// Message ref used for the channel join frame.
pub(crate) const JOIN_REF: &str = "1";

/// Heartbeat cadence; a heartbeat left unacknowledged for one full
/// interval marks the subscription timed out.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Handle to a running channel task; dropping the sender stops it.
pub(crate) struct RealtimeHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RealtimeHandle {
    /// Stop the channel task. Best-effort: errors are swallowed.
    pub(crate) fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.task.abort();
    }
}

/// Channel join frame subscribing to INSERTs on the events table.
pub(crate) fn join_message() -> String {
    serde_json::json!({
        "topic": EVENTS_TOPIC,
        "event": "phx_join",
        "ref": JOIN_REF,
        "payload": {
            "config": {
                "postgres_changes": [
                    { "event": "INSERT", "schema": "public", "table": "events" }
                ]
            }
        }
    })
    .to_string()
}

fn heartbeat_message(msg_ref: u64) -> String {
    serde_json::json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "ref": msg_ref.to_string(),
        "payload": {}
    })
    .to_string()
}

/// Spawn the background task that pumps the channel.
pub(crate) fn spawn_channel(
    sink: WsSink,
    read: WsRead,
    repos: HashSet<String>,
    on_event: EventCallback,
    on_status: StatusCallback,
) -> RealtimeHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run_channel(sink, read, repos, on_event, on_status, shutdown_rx));
    RealtimeHandle { shutdown_tx, task }
}

async fn run_channel(
    mut sink: WsSink,
    mut read: WsRead,
    repos: HashSet<String>,
    on_event: EventCallback,
    on_status: StatusCallback,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // First tick completes immediately; skip it so the first heartbeat
    // goes out one interval after join
    heartbeat.tick().await;

    let mut heartbeat_pending = false;
    let mut heartbeat_ref = 1u64;

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match handle_frame(&text, &repos, &on_event, &on_status) {
                            ChannelAction::Continue => {}
                            ChannelAction::HeartbeatAck => heartbeat_pending = false,
                            ChannelAction::Stop => break,
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "realtime channel closed by server");
                        on_status("CHANNEL_ERROR", None);
                        break;
                    }
                    Some(Err(e)) => {
                        let error = ConnectionError::Subscribe(e.to_string());
                        on_status("CHANNEL_ERROR", Some(&error));
                        break;
                    }
                    None => {
                        on_status("CHANNEL_ERROR", None);
                        break;
                    }
                    _ => {} // Ping/Pong/Binary — ignore
                }
            }
            _ = heartbeat.tick() => {
                if heartbeat_pending {
                    on_status("TIMED_OUT", None);
                    break;
                }
                heartbeat_ref += 1;
                heartbeat_pending = true;
                if sink.send(Message::Text(heartbeat_message(heartbeat_ref).into())).await.is_err() {
                    on_status("CHANNEL_ERROR", None);
                    break;
                }
            }
            _ = &mut shutdown_rx => break,
        }
    }
}

enum ChannelAction {
    Continue,
    HeartbeatAck,
    Stop,
}

#[derive(Deserialize)]
struct Frame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

fn handle_frame(
    text: &str,
    repos: &HashSet<String>,
    on_event: &EventCallback,
    on_status: &StatusCallback,
) -> ChannelAction {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "dropping unparseable realtime frame");
            return ChannelAction::Continue;
        }
    };

    match frame.event.as_str() {
        "phx_reply" => {
            let ok = frame.payload.get("status").and_then(Value::as_str) == Some("ok");
            if frame.topic == "phoenix" {
                // Heartbeat acknowledgement
                if ok {
                    return ChannelAction::HeartbeatAck;
                }
                on_status("CHANNEL_ERROR", None);
                return ChannelAction::Stop;
            }
            if ok {
                on_status("SUBSCRIBED", None);
            } else {
                let error = ConnectionError::Subscribe(frame.payload.to_string());
                on_status("CHANNEL_ERROR", Some(&error));
                return ChannelAction::Stop;
            }
            ChannelAction::Continue
        }
        "postgres_changes" => {
            if let Some(event) = decode_insert(&frame.payload) {
                if repos.contains(&event.repo) {
                    on_event(event);
                } else {
                    debug!(repo = %event.repo, "dropping event for unwatched repo");
                }
            }
            ChannelAction::Continue
        }
        "phx_error" => {
            let error = ConnectionError::Subscribe(frame.payload.to_string());
            on_status("CHANNEL_ERROR", Some(&error));
            ChannelAction::Stop
        }
        other => {
            // Backend-specific transitions pass through as strings
            on_status(other, None);
            ChannelAction::Continue
        }
    }
}

/// Decode an inserted row from a `postgres_changes` frame.
///
/// Malformed payloads (missing record, wrong field types) are logged
/// and dropped, never propagated to the event callback.
pub(crate) fn decode_insert(payload: &Value) -> Option<Event> {
    let Some(record) = payload
        .get("data")
        .and_then(|data| data.get("record"))
        .or_else(|| payload.get("record"))
        .or_else(|| payload.get("new"))
    else {
        warn!("dropping realtime frame without a record");
        return None;
    };

    match serde_json::from_value::<Event>(record.clone()) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "dropping malformed realtime event payload");
            None
        }
    }
}

#[cfg(test)]
#[path = "realtime_tests.rs"]
mod tests;
