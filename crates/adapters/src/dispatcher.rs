// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler dispatch via shell subprocess
//!
//! Commands are executed through `sh -c` deliberately, so operators can
//! compose pipelines and redirections in the command template. The
//! child runs in its own process group and the whole group is killed on
//! timeout so grandchildren cannot leak.

use async_trait::async_trait;
use metarelay_core::{Dispatcher, DispatchError, Event, HandlerConfig, HandlerResult, HandlerStatus};
use metarelay_handlers::resolve_template;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, warn};

/// Maximum captured output per dispatch, in bytes.
const MAX_OUTPUT_BYTES: usize = 10_000;

/// Dispatches handler commands by resolving templates and running a
/// bounded shell subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentDispatcher;

impl AgentDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dispatcher for AgentDispatcher {
    async fn dispatch(
        &self,
        handler: &HandlerConfig,
        event: &Event,
    ) -> Result<HandlerResult, DispatchError> {
        let command = resolve_template(&handler.command, event);

        info!(handler = %handler.name, %command, "dispatching handler");

        let start = Instant::now();
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let child = cmd.spawn().map_err(|source| DispatchError::Spawn {
            handler: handler.name.clone(),
            source,
        })?;
        // With process_group(0) the child's pid doubles as the group id
        let pgid = child.id();

        let timeout = Duration::from_secs(handler.timeout);
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let duration = round2(start.elapsed().as_secs_f64());
                let exit_code = output.status.code();
                let status = match exit_code {
                    Some(0) => HandlerStatus::Success,
                    _ => HandlerStatus::Failure,
                };
                Ok(HandlerResult {
                    handler_name: handler.name.clone(),
                    status,
                    exit_code,
                    output: combine_output(&output.stdout, &output.stderr),
                    duration_seconds: Some(duration),
                })
            }
            Ok(Err(source)) => Err(DispatchError::Wait {
                handler: handler.name.clone(),
                source,
            }),
            Err(_elapsed) => {
                warn!(
                    handler = %handler.name,
                    timeout = handler.timeout,
                    "handler timed out, killing process group"
                );
                kill_process_group(pgid);
                Ok(HandlerResult {
                    handler_name: handler.name.clone(),
                    status: HandlerStatus::Timeout,
                    exit_code: None,
                    output: Some(format!("Command timed out after {}s", handler.timeout)),
                    duration_seconds: Some(round2(start.elapsed().as_secs_f64())),
                })
            }
        }
    }
}

/// Concatenate captured streams: stdout alone, stderr alone, or both
/// joined with a `--- stderr ---` marker; `None` when both are empty.
/// The combined text is truncated to [`MAX_OUTPUT_BYTES`].
fn combine_output(stdout: &[u8], stderr: &[u8]) -> Option<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let combined = match (stdout.is_empty(), stderr.is_empty()) {
        (true, true) => return None,
        (false, true) => stdout.into_owned(),
        (true, false) => stderr.into_owned(),
        (false, false) => format!("{stdout}\n--- stderr ---\n{stderr}"),
    };
    Some(truncate_output(combined))
}

fn truncate_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT_BYTES {
        let mut end = MAX_OUTPUT_BYTES;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

fn kill_process_group(pgid: Option<u32>) {
    let Some(pgid) = pgid else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        warn!(pgid, error = %e, "failed to kill handler process group");
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
