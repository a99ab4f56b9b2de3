// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-delivery supervisor
//!
//! Main cycle: connect → catch-up → subscribe → wait for shutdown or
//! connection loss. On connection loss: disconnect, sleep with
//! exponential backoff, reconnect, catch up, resubscribe.
//!
//! Both catch-up and the live subscription funnel into the same
//! event-handling path (dedup → event file → match → dispatch → log →
//! cursor), which runs on the supervisor task only: the push callback
//! merely enqueues into a channel drained here, so the event store
//! stays single-writer.

use crate::backoff::Backoff;
use crate::config::{expand_tilde, Config};
use metarelay_core::{
    redact, CloudClient, ConnectionError, DispatchError, Dispatcher, Event, EventCallback,
    EventStore, EventStoreError, HandlerStatus, RelayStatus, StatusCallback,
};
use metarelay_handlers::HandlerRegistry;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events fetched per catch-up page.
const CATCH_UP_PAGE_SIZE: u32 = 100;

/// Name of the per-repo event side file, under `<repo>/.metarelay/`.
const EVENT_FILE_NAME: &str = "events.jsonl";

/// Supervisor errors. Connection errors trigger the reconnect path;
/// everything else is fatal to the run.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to install signal handler: {0}")]
    Signal(std::io::Error),
}

/// An awaitable one-way flag (set/clear/wait), used for the shutdown
/// and connection-lost signals.
#[derive(Default)]
struct Flag {
    set: AtomicBool,
    notify: Notify,
}

impl Flag {
    fn set(&self) {
        self.set.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn clear(&self) {
        self.set.store(false, Ordering::SeqCst);
    }

    fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a set() between the check and
            // the await is not lost
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

enum CycleEnd {
    Shutdown,
    ConnectionLost,
}

/// The relay supervisor, generic over its ports.
pub struct Supervisor<C, S, D> {
    config: Config,
    cloud: C,
    store: S,
    dispatcher: D,
    registry: HandlerRegistry,
    status: Mutex<RelayStatus>,
    shutdown: Arc<Flag>,
    connection_lost: Arc<Flag>,
}

impl<C, S, D> Supervisor<C, S, D>
where
    C: CloudClient,
    S: EventStore,
    D: Dispatcher,
{
    pub fn new(config: Config, cloud: C, store: S, dispatcher: D, registry: HandlerRegistry) -> Self {
        Self {
            config,
            cloud,
            store,
            dispatcher,
            registry,
            status: Mutex::new(RelayStatus::Stopped),
            shutdown: Arc::new(Flag::default()),
            connection_lost: Arc::new(Flag::default()),
        }
    }

    /// Current observable state.
    pub fn status(&self) -> RelayStatus {
        *self.status.lock()
    }

    /// Request a graceful shutdown; the main cycle exits at its next
    /// check. Safe to call from any task.
    pub fn request_shutdown(&self) {
        self.shutdown.set();
    }

    /// The event store backing this supervisor.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Main daemon loop with supervised reconnection. Returns on
    /// graceful shutdown or a fatal error.
    pub async fn run(&self) -> Result<(), SupervisorError> {
        self.set_status(RelayStatus::Starting);
        let signal_task = self.install_signal_handlers()?;

        let result = self.run_cycles().await;

        if let Err(e) = &result {
            self.set_status(RelayStatus::Error);
            error!(error = %redact(&e.to_string()), "supervisor error");
        }

        self.set_status(RelayStatus::ShuttingDown);
        info!("shutting down");
        self.cloud.disconnect().await;
        self.set_status(RelayStatus::Stopped);
        signal_task.abort();

        result
    }

    /// One-shot catch-up without subscribing to live events.
    pub async fn run_sync(&self) -> Result<(), SupervisorError> {
        self.set_status(RelayStatus::CatchingUp);
        self.cloud.connect().await?;

        let result = self.catch_up().await;

        self.cloud.disconnect().await;
        self.set_status(RelayStatus::Stopped);
        result
    }

    /// Map interrupt and terminate signals to the shutdown flag. The
    /// handler only sets the flag; all teardown happens on the main
    /// cycle.
    fn install_signal_handlers(&self) -> Result<JoinHandle<()>, SupervisorError> {
        let mut sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::Signal)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::Signal)?;
        let shutdown = Arc::clone(&self.shutdown);

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            info!("shutdown signal received");
            shutdown.set();
        }))
    }

    async fn run_cycles(&self) -> Result<(), SupervisorError> {
        let mut backoff = Backoff::new();

        while !self.shutdown.is_set() {
            self.connection_lost.clear();

            match self.run_cycle(&mut backoff).await {
                Ok(CycleEnd::Shutdown) => break,
                Ok(CycleEnd::ConnectionLost) => {}
                Err(SupervisorError::Connection(e)) => {
                    warn!(error = %redact(&e.to_string()), "connection error, will reconnect");
                }
                Err(e) => return Err(e),
            }

            self.set_status(RelayStatus::Reconnecting);
            self.cloud.disconnect().await;

            let delay = backoff.current();
            warn!(
                seconds = delay.as_secs_f64(),
                "connection lost, reconnecting"
            );
            tokio::time::sleep(delay).await;
            backoff.advance();
        }

        Ok(())
    }

    async fn run_cycle(&self, backoff: &mut Backoff) -> Result<CycleEnd, SupervisorError> {
        info!("connecting to cloud backend");
        self.cloud.connect().await?;

        self.set_status(RelayStatus::CatchingUp);
        info!("catching up on missed events");
        self.catch_up().await?;

        self.set_status(RelayStatus::Live);
        info!("subscribing to live events");

        // Push events funnel through this channel onto the supervisor
        // task; the callback itself never touches the store
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
        let push_tx = event_tx.clone();
        let on_event: EventCallback = Arc::new(move |event| {
            let _ = push_tx.send(event);
        });

        let lost = Arc::clone(&self.connection_lost);
        let on_status: StatusCallback = Arc::new(move |status, error| match status {
            "CHANNEL_ERROR" | "TIMED_OUT" => {
                warn!(
                    status,
                    error = ?error.map(|e| redact(&e.to_string())),
                    "subscription lost"
                );
                lost.set();
            }
            other => info!(status = other, "subscription status"),
        });

        self.cloud
            .subscribe(&self.config.repo_names(), on_event, on_status)
            .await?;

        // Reset only while still connected: a subscribe that lost the
        // channel before we got here must keep the backoff growing
        if !self.connection_lost.is_set() {
            backoff.reset();
        }

        info!("relay is live, waiting for events");

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => self.handle_event(&event).await?,
                _ = self.shutdown.wait() => return Ok(CycleEnd::Shutdown),
                _ = self.connection_lost.wait() => return Ok(CycleEnd::ConnectionLost),
            }
        }
    }

    /// Paginated catch-up: fetch events since the last cursor for each
    /// configured repo, in configuration order.
    async fn catch_up(&self) -> Result<(), SupervisorError> {
        for repo in self.config.repo_names() {
            let cursor = self.store.get_cursor(&repo)?;
            let mut after_id = cursor.map(|c| c.last_event_id).unwrap_or(0);

            info!(repo = %repo, after_id, "catching up");

            loop {
                let events = self
                    .cloud
                    .fetch_events_since(&repo, after_id, CATCH_UP_PAGE_SIZE)
                    .await?;
                if events.is_empty() {
                    break;
                }

                for event in events {
                    self.handle_event(&event).await?;
                    after_id = event.id;
                }
            }
        }
        Ok(())
    }

    /// The single funnel for both catch-up and live events:
    /// dedup → event file → match → dispatch → log → advance cursor.
    async fn handle_event(&self, event: &Event) -> Result<(), SupervisorError> {
        if self.store.has_event(event.id)? {
            debug!(event_id = event.id, "skipping duplicate event");
            return Ok(());
        }

        // Side file for persistent subagents watching the checkout
        self.write_event_file(event);

        let handlers = self.registry.matches(event);
        if handlers.is_empty() {
            debug!(
                event_id = event.id,
                event_type = %event.event_type,
                action = %event.action,
                "no handlers matched"
            );
        }

        for handler in handlers {
            info!(
                handler = %handler.name,
                event_id = event.id,
                event_type = %event.event_type,
                action = %event.action,
                "dispatching handler"
            );

            let result = self.dispatcher.dispatch(handler, event).await?;
            self.store.log_event(event, &result)?;

            match result.status {
                HandlerStatus::Success => info!(
                    handler = %handler.name,
                    duration = result.duration_seconds.unwrap_or(0.0),
                    "handler succeeded"
                ),
                status => warn!(
                    handler = %handler.name,
                    status = status.as_str(),
                    output = ?result.output,
                    "handler finished with non-success status"
                ),
            }
        }

        // The cursor advances even when nothing matched, so empty-match
        // events are not re-fetched forever
        self.store.set_cursor(&event.repo, event.id)?;
        Ok(())
    }

    /// Append the event as one JSON line to the repo's local
    /// `.metarelay/events.jsonl`. Best-effort: a write failure never
    /// blocks dispatch.
    fn write_event_file(&self, event: &Event) {
        let Some(repo_path) = self.config.repo_path(&event.repo) else {
            return;
        };

        let event_dir = expand_tilde(repo_path).join(".metarelay");
        let result = (|| -> std::io::Result<()> {
            std::fs::create_dir_all(&event_dir)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(event_dir.join(EVENT_FILE_NAME))?;
            let line = serde_json::to_string(event)?;
            writeln!(file, "{line}")
        })();

        if let Err(e) = result {
            warn!(
                event_id = event.id,
                path = %event_dir.display(),
                error = %e,
                "failed to write event file"
            );
        }
    }

    fn set_status(&self, status: RelayStatus) {
        *self.status.lock() = status;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
