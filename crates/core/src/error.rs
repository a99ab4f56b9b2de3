// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the relay

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid YAML in config file: {0}")]
    Yaml(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure talking to the cloud backend.
///
/// Carries backend errors as strings so the port stays agnostic of any
/// particular client stack.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected; call connect() first")]
    NotConnected,

    #[error("already connected; call disconnect() first")]
    AlreadyConnected,

    #[error("failed to connect to cloud backend: {0}")]
    Connect(String),

    #[error("failed to fetch events: {0}")]
    Fetch(String),

    #[error("failed to subscribe to push channel: {0}")]
    Subscribe(String),
}

/// Handler subprocess failed to start or died in an unexpected way.
///
/// Distinct from a non-success [`HandlerResult`](crate::HandlerResult):
/// a dispatch error aborts the current event so the cursor does not
/// advance past it.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to execute handler {handler}: {source}")]
    Spawn {
        handler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect output of handler {handler}: {source}")]
    Wait {
        handler: String,
        #[source]
        source: std::io::Error,
    },
}

/// Local persistence layer error. Fatal to the supervisor cycle.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("failed to open event store: {0}")]
    Open(String),

    #[error("event store query failed: {0}")]
    Query(String),

    #[error("event store is closed")]
    Closed,
}

/// Common base for all relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}
