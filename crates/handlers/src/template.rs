// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command template resolution
//!
//! Placeholders are written `{{PATH}}` where `PATH` uses the same
//! dotted grammar as filter expressions.

use metarelay_core::Event;
use regex::Regex;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TEMPLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(\w+(?:\.\w+)*)\}\}").expect("constant regex pattern is valid")
});

/// Substitute `{{path}}` placeholders in a command template.
///
/// Unknown paths, null intermediates, and null leaves all resolve to
/// the empty string; non-string values are stringified. Pure function
/// of `(template, event)` — no external state is observed or mutated.
pub fn resolve_template(template: &str, event: &Event) -> String {
    TEMPLATE_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            event.field_str(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
