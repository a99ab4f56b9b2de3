// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use metarelay_core::{
    CloudClient, ConnectionError, DispatchError, Dispatcher, Event, EventCallback, HandlerConfig,
    HandlerResult, HandlerStatus, StatusCallback,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Recorded call to [`FakeCloudClient`]
#[derive(Debug, Clone, PartialEq)]
pub enum CloudCall {
    Connect,
    Disconnect,
    Fetch {
        repo: String,
        after_id: i64,
        limit: u32,
    },
    Subscribe {
        repos: Vec<String>,
    },
}

#[derive(Default)]
struct FakeCloudState {
    connected: bool,
    calls: Vec<CloudCall>,
    fetch_pages: HashMap<String, VecDeque<Vec<Event>>>,
    connect_errors: usize,
    subscribe_failures: usize,
    subscribe_times: Vec<Instant>,
    callbacks: Option<(EventCallback, StatusCallback)>,
}

/// Fake cloud client for testing the supervisor.
///
/// Catch-up pages are scripted per repo; push events and subscription
/// status transitions are injected manually through the captured
/// callbacks. All calls are recorded.
#[derive(Clone, Default)]
pub struct FakeCloudClient {
    inner: Arc<Mutex<FakeCloudState>>,
    subscribed: Arc<Notify>,
}

impl FakeCloudClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one catch-up page for a repo. Pages are returned in queue
    /// order; an exhausted queue returns empty pages.
    pub fn push_fetch_page(&self, repo: &str, events: Vec<Event>) {
        self.inner
            .lock()
            .fetch_pages
            .entry(repo.to_string())
            .or_default()
            .push_back(events);
    }

    /// Make the next `n` connect calls fail.
    pub fn fail_connects(&self, n: usize) {
        self.inner.lock().connect_errors = n;
    }

    /// Make the next `n` subscribe calls report `CHANNEL_ERROR`
    /// immediately (the subscribe itself still returns cleanly).
    pub fn fail_subscribes(&self, n: usize) {
        self.inner.lock().subscribe_failures = n;
    }

    /// Deliver a push event through the captured event callback.
    pub fn push_event(&self, event: Event) {
        let callback = {
            let state = self.inner.lock();
            assert!(state.callbacks.is_some(), "no active subscription");
            state.callbacks.as_ref().map(|(on_event, _)| Arc::clone(on_event))
        };
        if let Some(on_event) = callback {
            on_event(event);
        }
    }

    /// Fire a subscription status transition.
    pub fn emit_status(&self, status: &str) {
        let callback = {
            let state = self.inner.lock();
            assert!(state.callbacks.is_some(), "no active subscription");
            state.callbacks.as_ref().map(|(_, on_status)| Arc::clone(on_status))
        };
        if let Some(on_status) = callback {
            on_status(status, None);
        }
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<CloudCall> {
        self.inner.lock().calls.clone()
    }

    /// Times at which subscribe was called (tokio clock).
    pub fn subscribe_times(&self) -> Vec<Instant> {
        self.inner.lock().subscribe_times.clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.inner.lock().subscribe_times.len()
    }

    /// Wait until at least `n` subscribe calls have been made.
    pub async fn wait_for_subscribes(&self, n: usize) {
        loop {
            let notified = self.subscribed.notified();
            tokio::pin!(notified);
            // Register before checking so a notify between the check and
            // the await is not lost
            notified.as_mut().enable();
            if self.inner.lock().subscribe_times.len() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl CloudClient for FakeCloudClient {
    async fn connect(&self) -> Result<(), ConnectionError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::Connect);
        if state.connect_errors > 0 {
            state.connect_errors -= 1;
            return Err(ConnectionError::Connect("scripted failure".to_string()));
        }
        if state.connected {
            return Err(ConnectionError::AlreadyConnected);
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::Disconnect);
        state.connected = false;
        state.callbacks = None;
    }

    async fn fetch_events_since(
        &self,
        repo: &str,
        after_id: i64,
        limit: u32,
    ) -> Result<Vec<Event>, ConnectionError> {
        let mut state = self.inner.lock();
        if !state.connected {
            return Err(ConnectionError::NotConnected);
        }
        state.calls.push(CloudCall::Fetch {
            repo: repo.to_string(),
            after_id,
            limit,
        });
        let page = state
            .fetch_pages
            .get_mut(repo)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        Ok(page)
    }

    async fn subscribe(
        &self,
        repos: &[String],
        on_event: EventCallback,
        on_status: StatusCallback,
    ) -> Result<(), ConnectionError> {
        let fail = {
            let mut state = self.inner.lock();
            if !state.connected {
                return Err(ConnectionError::NotConnected);
            }
            state.calls.push(CloudCall::Subscribe {
                repos: repos.to_vec(),
            });
            state.subscribe_times.push(Instant::now());
            state.callbacks = Some((on_event, Arc::clone(&on_status)));
            if state.subscribe_failures > 0 {
                state.subscribe_failures -= 1;
                true
            } else {
                false
            }
        };

        // Scripted immediate loss fires outside the lock, like a real
        // channel task would
        if fail {
            on_status("CHANNEL_ERROR", None);
        }
        self.subscribed.notify_waiters();
        Ok(())
    }
}

#[derive(Default)]
struct FakeDispatchState {
    dispatched: Vec<(String, i64)>,
    results: HashMap<String, HandlerResult>,
    failing: HashMap<String, String>,
}

/// Fake dispatcher recording every dispatch.
///
/// Returns a scripted result per handler name, a generic success
/// otherwise; scripted failures raise [`DispatchError`].
#[derive(Clone, Default)]
pub struct FakeDispatcher {
    inner: Arc<Mutex<FakeDispatchState>>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result returned for a handler name.
    pub fn script_result(&self, handler_name: &str, result: HandlerResult) {
        self.inner
            .lock()
            .results
            .insert(handler_name.to_string(), result);
    }

    /// Make dispatches for a handler name raise a [`DispatchError`].
    pub fn fail_handler(&self, handler_name: &str, message: &str) {
        self.inner
            .lock()
            .failing
            .insert(handler_name.to_string(), message.to_string());
    }

    /// `(handler_name, event_id)` pairs in dispatch order.
    pub fn dispatched(&self) -> Vec<(String, i64)> {
        self.inner.lock().dispatched.clone()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn dispatch(
        &self,
        handler: &HandlerConfig,
        event: &Event,
    ) -> Result<HandlerResult, DispatchError> {
        let mut state = self.inner.lock();
        state.dispatched.push((handler.name.clone(), event.id));

        if let Some(message) = state.failing.get(&handler.name) {
            return Err(DispatchError::Spawn {
                handler: handler.name.clone(),
                source: std::io::Error::other(message.clone()),
            });
        }

        Ok(state
            .results
            .get(&handler.name)
            .cloned()
            .unwrap_or_else(|| HandlerResult {
                handler_name: handler.name.clone(),
                status: HandlerStatus::Success,
                exit_code: Some(0),
                output: None,
                duration_seconds: Some(0.01),
            }))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
