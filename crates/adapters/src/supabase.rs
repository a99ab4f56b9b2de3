// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supabase cloud client: PostgREST for catch-up, Realtime for live events

use crate::realtime::{self, RealtimeHandle};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use metarelay_core::{CloudClient, ConnectionError, Event, EventCallback, StatusCallback};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::collections::HashSet;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::info;

/// Cloud client using Supabase REST for catch-up and Realtime for live
/// events. One push subscription at a time; the connection handle and
/// channel handle are owned here.
pub struct SupabaseClient {
    url: String,
    key: String,
    state: Mutex<ClientState>,
}

#[derive(Default)]
struct ClientState {
    http: Option<reqwest::Client>,
    realtime: Option<RealtimeHandle>,
}

impl SupabaseClient {
    /// Create a disconnected client for the given project URL and key.
    pub fn new(supabase_url: impl Into<String>, supabase_key: impl Into<String>) -> Self {
        let url = supabase_url.into().trim_end_matches('/').to_string();
        Self {
            url,
            key: supabase_key.into(),
            state: Mutex::new(ClientState::default()),
        }
    }

    fn http(&self) -> Result<reqwest::Client, ConnectionError> {
        self.state
            .lock()
            .http
            .clone()
            .ok_or(ConnectionError::NotConnected)
    }
}

#[async_trait]
impl CloudClient for SupabaseClient {
    async fn connect(&self) -> Result<(), ConnectionError> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(&self.key)
            .map_err(|e| ConnectionError::Connect(format!("invalid api key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.key))
            .map_err(|e| ConnectionError::Connect(format!("invalid api key: {e}")))?;
        headers.insert("apikey", key_value);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;

        let mut state = self.state.lock();
        if state.http.is_some() {
            return Err(ConnectionError::AlreadyConnected);
        }
        state.http = Some(client);
        Ok(())
    }

    async fn disconnect(&self) {
        let (handle, was_connected) = {
            let mut state = self.state.lock();
            (state.realtime.take(), state.http.take().is_some())
        };
        if let Some(handle) = handle {
            handle.shutdown();
        }
        if was_connected {
            info!("disconnected from cloud backend");
        }
    }

    async fn fetch_events_since(
        &self,
        repo: &str,
        after_id: i64,
        limit: u32,
    ) -> Result<Vec<Event>, ConnectionError> {
        let http = self.http()?;
        let fetch_err = |e: reqwest::Error| ConnectionError::Fetch(e.to_string());

        let response = http
            .get(format!("{}/rest/v1/events", self.url))
            .query(&[
                ("select", "*".to_string()),
                ("repo", format!("eq.{repo}")),
                ("id", format!("gt.{after_id}")),
                ("order", "id.asc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(fetch_err)?
            .error_for_status()
            .map_err(fetch_err)?;

        response.json().await.map_err(fetch_err)
    }

    async fn subscribe(
        &self,
        repos: &[String],
        on_event: EventCallback,
        on_status: StatusCallback,
    ) -> Result<(), ConnectionError> {
        {
            let state = self.state.lock();
            if state.http.is_none() {
                return Err(ConnectionError::NotConnected);
            }
            if state.realtime.is_some() {
                return Err(ConnectionError::Subscribe(
                    "a subscription channel is already open".to_string(),
                ));
            }
        }

        let ws_url = websocket_url(&self.url, &self.key);
        let (stream, _response) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| ConnectionError::Subscribe(e.to_string()))?;
        let (mut sink, read) = stream.split();

        sink.send(Message::Text(realtime::join_message().into()))
            .await
            .map_err(|e| ConnectionError::Subscribe(e.to_string()))?;

        let repo_set: HashSet<String> = repos.iter().cloned().collect();
        let handle = realtime::spawn_channel(sink, read, repo_set, on_event, on_status);

        self.state.lock().realtime = Some(handle);
        info!(topic = realtime::EVENTS_TOPIC, "subscribed to realtime channel");
        Ok(())
    }
}

/// Realtime endpoint for a project URL.
fn websocket_url(base_url: &str, key: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("wss://{base_url}")
    };
    format!("{ws_base}/realtime/v1/websocket?apikey={key}&vsn=1.0.0")
}

#[cfg(test)]
#[path = "supabase_tests.rs"]
mod tests;
