// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler rules and dispatch outcomes

use serde::{Deserialize, Serialize};

/// Default dispatch timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_enabled() -> bool {
    true
}

/// Declarative rule pairing an (event_type, action) selector with a
/// command template. Loaded once at startup, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Operator-chosen identifier (not required unique)
    pub name: String,
    /// Event type to match exactly
    pub event_type: String,
    /// Event action to match exactly
    pub action: String,
    /// Command template, `{{path}}` placeholders substituted at dispatch
    pub command: String,
    /// Filter expressions, AND-combined
    #[serde(default)]
    pub filters: Vec<String>,
    /// Execution timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Whether the handler participates in matching
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Outcome of one handler execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerStatus {
    Success,
    Failure,
    Skipped,
    Timeout,
    Error,
}

impl HandlerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerStatus::Success => "success",
            HandlerStatus::Failure => "failure",
            HandlerStatus::Skipped => "skipped",
            HandlerStatus::Timeout => "timeout",
            HandlerStatus::Error => "error",
        }
    }
}

/// Result of dispatching a handler for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    /// Name of the handler that ran
    pub handler_name: String,
    /// Execution outcome
    pub status: HandlerStatus,
    /// Process exit code, when the process ran to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured stdout/stderr, truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Wall-clock execution time, rounded to two decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
