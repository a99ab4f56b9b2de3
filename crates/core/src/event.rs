// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook events received from the cloud backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Webhook event types the relay is commonly configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownEventType {
    CheckRun,
    CheckSuite,
    WorkflowRun,
    PullRequestReview,
    PullRequestReviewComment,
}

impl KnownEventType {
    /// The wire string for this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownEventType::CheckRun => "check_run",
            KnownEventType::CheckSuite => "check_suite",
            KnownEventType::WorkflowRun => "workflow_run",
            KnownEventType::PullRequestReview => "pull_request_review",
            KnownEventType::PullRequestReviewComment => "pull_request_review_comment",
        }
    }
}

/// A webhook event relayed from the upstream forge via the cloud backend.
///
/// Events are immutable once constructed. The `id` is assigned by the
/// upstream table and doubles as the per-repo cursor value and the
/// dedup key in the local event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Remote event id (monotonic, unique per source)
    pub id: i64,
    /// Full repo name, "owner/name" form
    pub repo: String,
    /// Upstream event type (e.g. check_run)
    pub event_type: String,
    /// Event action (e.g. completed, submitted)
    #[serde(default)]
    pub action: String,
    /// Git ref (branch or tag), if the event carries one
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Username that triggered the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Human-readable one-line summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full upstream payload (empty mapping if absent upstream)
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Upstream delivery correlation token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    /// When the event was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Resolve a dotted field path against this event.
    ///
    /// The first segment is a top-level attribute name (`repo`,
    /// `event_type`, `action`, `ref`, `actor`, `summary`, `id`,
    /// `delivery_id`) or `payload`; remaining segments traverse mapping
    /// lookups under `payload`. A missing segment or a non-mapping
    /// intermediate resolves to `None`.
    ///
    /// Shared by filter evaluation and template substitution so both see
    /// identical resolution semantics.
    pub fn field(&self, path: &str) -> Option<Value> {
        let mut parts = path.split('.');
        let root = parts.next()?;

        if root == "payload" {
            let mut value: Option<&Value> = None;
            let mut map: Option<&Map<String, Value>> = Some(&self.payload);
            for part in parts {
                let current = map?;
                value = current.get(part);
                map = value.and_then(Value::as_object);
            }
            return match value {
                Some(v) => Some(v.clone()),
                None if path == "payload" => Some(Value::Object(self.payload.clone())),
                None => None,
            };
        }

        match root {
            "id" => Some(Value::from(self.id)),
            "repo" => Some(Value::String(self.repo.clone())),
            "event_type" => Some(Value::String(self.event_type.clone())),
            "action" => Some(Value::String(self.action.clone())),
            "ref" => self.git_ref.clone().map(Value::String),
            "actor" => self.actor.clone().map(Value::String),
            "summary" => self.summary.clone().map(Value::String),
            "delivery_id" => self.delivery_id.clone().map(Value::String),
            _ => None,
        }
    }

    /// String form of a resolved field, for filter comparison and
    /// template substitution. `None` and JSON null render as `None`.
    pub fn field_str(&self, path: &str) -> Option<String> {
        match self.field(path)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
