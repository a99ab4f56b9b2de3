// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter expression evaluation
//!
//! Each filter is a string of the form `FIELD OP 'VALUE'` (or with
//! double quotes), where `OP` is `==` or `!=` and `FIELD` is a dotted
//! path resolved against the event.

use metarelay_core::Event;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static FILTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\w+(?:\.\w+)*)\s*(==|!=)\s*['"](.+?)['"]$"#)
        .expect("constant regex pattern is valid")
});

/// Evaluate a filter list against an event. All expressions must pass
/// (AND logic). An unparseable expression makes the whole list false
/// and logs a warning; it never raises.
pub fn evaluate_filters(filters: &[String], event: &Event) -> bool {
    for expr in filters {
        let Some(caps) = FILTER_PATTERN.captures(expr.trim()) else {
            warn!(filter = %expr, "invalid filter expression");
            return false;
        };

        let (field_path, operator, expected) = (&caps[1], &caps[2], &caps[3]);
        let actual = event.field_str(field_path);

        let equal = actual.as_deref() == Some(expected);
        match operator {
            "==" if !equal => return false,
            "!=" if equal => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
