// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in handler presets for common CI orchestration patterns
//!
//! Ready-made [`HandlerConfig`] values operators can register as-is or
//! copy into their configuration as a starting point.

use metarelay_core::{HandlerConfig, KnownEventType};

/// Invoke the PR shepherd when a check run concludes with failure.
pub fn pr_shepherd_ci_failure() -> HandlerConfig {
    HandlerConfig {
        name: "pr-shepherd-ci-failure".to_string(),
        event_type: KnownEventType::CheckRun.as_str().to_string(),
        action: "completed".to_string(),
        command: "claude -p 'Run /project:pr-shepherd for the PR on branch {{ref}} \
                  in {{repo}}. The check run {{summary}} concluded with {{payload.conclusion}}. \
                  Investigate the failure and fix it.'"
            .to_string(),
        filters: vec!["payload.conclusion == 'failure'".to_string()],
        timeout: 300,
        enabled: true,
    }
}

/// Invoke the PR shepherd when a workflow run fails.
pub fn pr_shepherd_workflow_failure() -> HandlerConfig {
    HandlerConfig {
        name: "pr-shepherd-workflow-failure".to_string(),
        event_type: KnownEventType::WorkflowRun.as_str().to_string(),
        action: "completed".to_string(),
        command: "claude -p 'Run /project:pr-shepherd for {{repo}}. \
                  Workflow {{summary}} on {{ref}} has failed with conclusion \
                  {{payload.conclusion}}. Investigate and fix.'"
            .to_string(),
        filters: vec!["payload.conclusion == 'failure'".to_string()],
        timeout: 300,
        enabled: true,
    }
}

/// Respond to new PR review comments.
pub fn handle_pr_review_comment() -> HandlerConfig {
    HandlerConfig {
        name: "handle-review-comment".to_string(),
        event_type: KnownEventType::PullRequestReviewComment.as_str().to_string(),
        action: "created".to_string(),
        command: "claude -p 'Run /project:handle-pr-comments for {{repo}}. \
                  New review comment from {{actor}}: {{summary}}'"
            .to_string(),
        filters: vec![],
        timeout: 300,
        enabled: true,
    }
}

/// Respond to submitted PR reviews.
pub fn handle_pr_review_submitted() -> HandlerConfig {
    HandlerConfig {
        name: "handle-review-submitted".to_string(),
        event_type: KnownEventType::PullRequestReview.as_str().to_string(),
        action: "submitted".to_string(),
        command: "claude -p 'Run /project:handle-pr-comments for {{repo}}. \
                  {{actor}} submitted a review: {{summary}}'"
            .to_string(),
        filters: vec![],
        timeout: 300,
        enabled: true,
    }
}

/// All built-in preset constructors.
pub fn all() -> Vec<HandlerConfig> {
    vec![
        pr_shepherd_ci_failure(),
        pr_shepherd_workflow_failure(),
        handle_pr_review_comment(),
        handle_pr_review_submitted(),
    ]
}

#[cfg(test)]
#[path = "presets_tests.rs"]
mod tests;
