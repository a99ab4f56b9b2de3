// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observable supervisor states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of the relay supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStatus {
    Starting,
    CatchingUp,
    Live,
    Reconnecting,
    ShuttingDown,
    Stopped,
    Error,
}

impl RelayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStatus::Starting => "starting",
            RelayStatus::CatchingUp => "catching_up",
            RelayStatus::Live => "live",
            RelayStatus::Reconnecting => "reconnecting",
            RelayStatus::ShuttingDown => "shutting_down",
            RelayStatus::Stopped => "stopped",
            RelayStatus::Error => "error",
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
