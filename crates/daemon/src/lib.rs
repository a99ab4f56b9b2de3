// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! metarelay daemon: event-delivery supervisor with catch-up and live
//! subscription
//!
//! The supervisor drives a supervised reconnection loop: if the push
//! subscription drops (`CHANNEL_ERROR` or `TIMED_OUT`), it disconnects,
//! waits with exponential backoff, reconnects, catches up on missed
//! events, and resubscribes.

mod backoff;
pub mod config;
mod container;
mod supervisor;

pub use backoff::Backoff;
pub use config::{load_config, Config};
pub use container::{open_store, production, ProductionSupervisor};
pub use supervisor::{Supervisor, SupervisorError};
