// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sensitive-data redaction for externally visible error text
//!
//! Error messages can embed credentials (cloud keys in URLs, bearer
//! headers, forge tokens). Every message is passed through [`redact`]
//! before it reaches a log line or CLI output. The original error value
//! stays intact in the source chain for internal debugging.

use regex::Regex;
use std::sync::LazyLock;

// Allow expect here as the regex patterns are compile-time verified to be valid
#[allow(clippy::expect_used)]
static PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Forge personal access tokens
        (
            Regex::new(r"ghp_[A-Za-z0-9_]{36,}").expect("constant regex pattern is valid"),
            "<REDACTED_TOKEN>",
        ),
        (
            Regex::new(r"gho_[A-Za-z0-9_]{36,}").expect("constant regex pattern is valid"),
            "<REDACTED_TOKEN>",
        ),
        (
            Regex::new(r"github_pat_[A-Za-z0-9_]{22,}").expect("constant regex pattern is valid"),
            "<REDACTED_TOKEN>",
        ),
        // JWT-shaped triples (cloud service keys)
        (
            Regex::new(r"eyJ[A-Za-z0-9_-]{20,}\.[A-Za-z0-9_-]{20,}\.[A-Za-z0-9_-]{20,}")
                .expect("constant regex pattern is valid"),
            "<REDACTED_JWT>",
        ),
        // URL userinfo credentials
        (
            Regex::new(r"://[^@\s]+:[^@\s]+@").expect("constant regex pattern is valid"),
            "://<REDACTED_CREDS>@",
        ),
        // Authorization headers
        (
            Regex::new(r"(?i)(Authorization:\s*Bearer\s+)\S+")
                .expect("constant regex pattern is valid"),
            "${1}<REDACTED_TOKEN>",
        ),
        // key=long-opaque-value pairs (webhook secrets and the like)
        (
            Regex::new(r#"(?i)(secret["']?\s*[:=]\s*["']?)[A-Za-z0-9_-]{16,}"#)
                .expect("constant regex pattern is valid"),
            "${1}<REDACTED_SECRET>",
        ),
    ]
});

/// Replace credential-shaped substrings with fixed placeholders.
pub fn redact(message: &str) -> String {
    let mut redacted = message.to_string();
    for (pattern, replacement) in PATTERNS.iter() {
        redacted = pattern.replace_all(&redacted, *replacement).into_owned();
    }
    redacted
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
