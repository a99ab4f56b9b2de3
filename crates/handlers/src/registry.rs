// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler registry: routes events to matching handler configurations

use crate::filter::evaluate_filters;
use metarelay_core::{Event, HandlerConfig};

/// Ordered collection of handler rules, constructed once at startup.
///
/// Matching returns every enabled handler whose `event_type` and
/// `action` both equal the event's fields and whose filters all
/// evaluate true, in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: Vec<HandlerConfig>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<HandlerConfig>) -> Self {
        Self { handlers }
    }

    /// Append a handler rule.
    pub fn register(&mut self, handler: HandlerConfig) {
        self.handlers.push(handler);
    }

    /// All registered handlers, in registration order.
    pub fn handlers(&self) -> &[HandlerConfig] {
        &self.handlers
    }

    /// Find all handlers matching an event.
    pub fn matches(&self, event: &Event) -> Vec<&HandlerConfig> {
        self.handlers
            .iter()
            .filter(|h| h.enabled)
            .filter(|h| h.event_type == event.event_type)
            .filter(|h| h.action == event.action)
            .filter(|h| evaluate_filters(&h.filters, event))
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
