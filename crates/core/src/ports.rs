// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port traits for the relay (hexagonal architecture)
//!
//! The supervisor depends only on these contracts; concrete adapters
//! live in `metarelay-adapters` and `metarelay-storage`.

use crate::cursor::CursorPosition;
use crate::error::{ConnectionError, DispatchError, EventStoreError};
use crate::event::Event;
use crate::handler::{HandlerConfig, HandlerResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Callback invoked for each push-delivered event.
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

/// Callback invoked on every subscription state transition.
///
/// The status string is drawn from `SUBSCRIBED`, `CHANNEL_ERROR`,
/// `TIMED_OUT`, plus any backend-specific values passed through; the
/// adapter normalizes richer status values to strings before calling.
pub type StatusCallback = Arc<dyn Fn(&str, Option<&ConnectionError>) + Send + Sync>;

/// Port for local event persistence and cursor management.
///
/// All operations are bounded synchronous calls; implementations
/// serialize access internally (single connection behind a mutex).
pub trait EventStore: Send + Sync {
    /// Current cursor for a repo, or `None` if never set.
    fn get_cursor(&self, repo: &str) -> Result<Option<CursorPosition>, EventStoreError>;

    /// Upsert the cursor for a repo. Durable before return.
    fn set_cursor(&self, repo: &str, last_event_id: i64) -> Result<(), EventStoreError>;

    /// Record a processed event and its handler result.
    ///
    /// A uniqueness violation on the remote id silently succeeds: the
    /// event was already recorded in this or a prior run.
    fn log_event(&self, event: &Event, result: &HandlerResult) -> Result<(), EventStoreError>;

    /// Dedup gate: has this remote event id already been logged?
    fn has_event(&self, remote_id: i64) -> Result<bool, EventStoreError>;

    /// Release the underlying resource. Later calls fail with
    /// [`EventStoreError::Closed`].
    fn close(&self) -> Result<(), EventStoreError>;
}

/// Port for the cloud backend the relay consumes events from.
///
/// Retry policy lives in the supervisor, not here: every operation
/// fails with a [`ConnectionError`] when its precondition is violated.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Establish the underlying connection(s). Invalid while connected.
    async fn connect(&self) -> Result<(), ConnectionError>;

    /// Tear down any open subscription channel (best-effort) and then
    /// the connection. Idempotent.
    async fn disconnect(&self);

    /// All events with `id > after_id` for the repo, ordered by id
    /// ascending, at most `limit` items. An empty result means "no more
    /// events now" and stops pagination.
    async fn fetch_events_since(
        &self,
        repo: &str,
        after_id: i64,
        limit: u32,
    ) -> Result<Vec<Event>, ConnectionError>;

    /// Open a single push subscription for newly inserted events.
    ///
    /// `on_event` fires for each arriving event whose repo is in
    /// `repos`; events for other repos are silently dropped, and
    /// malformed push payloads are logged and dropped by the client.
    async fn subscribe(
        &self,
        repos: &[String],
        on_event: EventCallback,
        on_status: StatusCallback,
    ) -> Result<(), ConnectionError>;
}

/// Port for dispatching handlers in response to events.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Resolve the handler's command template against the event and
    /// execute it, returning the outcome.
    ///
    /// Non-success outcomes (non-zero exit, timeout) are results, not
    /// errors; only a failure to execute at all raises.
    async fn dispatch(
        &self,
        handler: &HandlerConfig,
        event: &Event,
    ) -> Result<HandlerResult, DispatchError>;
}
