// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! metarelay-core: domain models, ports, and errors for the metarelay daemon

pub mod cursor;
pub mod error;
pub mod event;
pub mod handler;
pub mod ports;
pub mod redact;
pub mod status;

pub use cursor::CursorPosition;
pub use error::{ConfigError, ConnectionError, DispatchError, EventStoreError, RelayError};
pub use event::{Event, KnownEventType};
pub use handler::{HandlerConfig, HandlerResult, HandlerStatus};
pub use ports::{CloudClient, Dispatcher, EventCallback, EventStore, StatusCallback};
pub use redact::redact;
pub use status::RelayStatus;
