// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repo cursor positions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// High-water mark of the last processed event id for one repo.
///
/// `last_event_id` is monotonically non-decreasing per repo across the
/// process lifetime; the supervisor only ever advances it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Full repo name, "owner/name" form
    pub repo: String,
    /// Id of the last processed event
    pub last_event_id: i64,
    /// When the cursor was last advanced
    pub updated_at: DateTime<Utc>,
}
