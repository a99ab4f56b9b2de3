// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed event store for cursor tracking and event dedup.
//!
//! Security contract: the database directory is created mode 0700 and
//! the file is kept at mode 0600. Existing permissive modes are
//! tightened with a user-visible warning.

use chrono::{DateTime, Utc};
use metarelay_core::{CursorPosition, Event, EventStore, EventStoreError, HandlerResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::warn;

const CREATE_TABLES_SQL: &str = "
CREATE TABLE IF NOT EXISTS cursor (
    repo TEXT PRIMARY KEY,
    last_event_id INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS event_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER NOT NULL UNIQUE,
    repo TEXT NOT NULL,
    event_type TEXT NOT NULL,
    action TEXT NOT NULL,
    summary TEXT,
    handler_name TEXT,
    handler_status TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_event_log_repo ON event_log(repo);
CREATE INDEX IF NOT EXISTS idx_event_log_remote_id ON event_log(remote_id);
";

/// Mode bits that must not be set on the database file.
const GROUP_OTHER_BITS: u32 = 0o077;

/// SQLite event store implementing the [`EventStore`] port.
///
/// Cursor tracking per repo plus event dedup via the `event_log`
/// UNIQUE constraint on `remote_id`. Access is serialized through a
/// single connection behind a mutex; `close()` drops the connection.
pub struct SqliteEventStore {
    db_path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteEventStore {
    /// Open (creating lazily) the store at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, EventStoreError> {
        let db_path = db_path.into();
        ensure_secure_path(&db_path)?;

        let conn = Connection::open(&db_path)
            .map_err(|e| EventStoreError::Open(format!("failed to open {}: {e}", db_path.display())))?;
        conn.execute_batch("PRAGMA synchronous = FULL;")
            .map_err(open_err)?;
        conn.execute_batch(CREATE_TABLES_SQL).map_err(open_err)?;

        // File is guaranteed to exist once the schema has been applied
        set_mode(&db_path, 0o600)?;

        Ok(Self {
            db_path,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, EventStoreError> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(EventStoreError::Closed)?;
        f(conn).map_err(|e| EventStoreError::Query(e.to_string()))
    }
}

impl EventStore for SqliteEventStore {
    fn get_cursor(&self, repo: &str) -> Result<Option<CursorPosition>, EventStoreError> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT repo, last_event_id, updated_at FROM cursor WHERE repo = ?1",
                params![repo],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
        })?;

        match row {
            None => Ok(None),
            Some((repo, last_event_id, updated_at)) => {
                let updated_at = updated_at
                    .parse::<DateTime<Utc>>()
                    .map_err(|e| EventStoreError::Query(format!("corrupt cursor timestamp: {e}")))?;
                Ok(Some(CursorPosition {
                    repo,
                    last_event_id,
                    updated_at,
                }))
            }
        }
    }

    fn set_cursor(&self, repo: &str, last_event_id: i64) -> Result<(), EventStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cursor (repo, last_event_id, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(repo) DO UPDATE SET
                     last_event_id = excluded.last_event_id,
                     updated_at = excluded.updated_at",
                params![repo, last_event_id, Utc::now().to_rfc3339()],
            )
            .map(|_| ())
        })
    }

    fn log_event(&self, event: &Event, result: &HandlerResult) -> Result<(), EventStoreError> {
        // INSERT OR IGNORE: a duplicate remote_id means the event is
        // already logged (this run or a prior one) and is not a failure
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO event_log (
                     remote_id, repo, event_type, action,
                     summary, handler_name, handler_status, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.id,
                    event.repo,
                    event.event_type,
                    event.action,
                    event.summary,
                    result.handler_name,
                    result.status.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map(|_| ())
        })
    }

    fn has_event(&self, remote_id: i64) -> Result<bool, EventStoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM event_log WHERE remote_id = ?1",
                params![remote_id],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
        })
    }

    fn close(&self) -> Result<(), EventStoreError> {
        if let Some(conn) = self.conn.lock().take() {
            conn.close()
                .map_err(|(_, e)| EventStoreError::Query(e.to_string()))?;
        }
        Ok(())
    }
}

fn open_err(e: rusqlite::Error) -> EventStoreError {
    EventStoreError::Open(e.to_string())
}

/// Ensure the database directory and any existing file carry owner-only
/// permissions before the connection is opened.
fn ensure_secure_path(db_path: &Path) -> Result<(), EventStoreError> {
    if let Some(dir) = db_path.parent() {
        if dir.as_os_str().is_empty() {
            // Relative path in the current directory; nothing to create
        } else if !dir.exists() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(dir)
                .map_err(|e| {
                    EventStoreError::Open(format!("failed to create {}: {e}", dir.display()))
                })?;
        } else {
            let mode = path_mode(dir)?;
            if mode != 0o700 {
                set_mode(dir, 0o700)?;
            }
        }
    }

    if db_path.exists() {
        let mode = path_mode(db_path)?;
        if mode & GROUP_OTHER_BITS != 0 {
            warn!(
                path = %db_path.display(),
                mode = format!("{mode:o}"),
                "database file had permissive permissions, fixing to 0600"
            );
            set_mode(db_path, 0o600)?;
        }
    }

    Ok(())
}

fn path_mode(path: &Path) -> Result<u32, EventStoreError> {
    let metadata = fs::metadata(path)
        .map_err(|e| EventStoreError::Open(format!("failed to stat {}: {e}", path.display())))?;
    Ok(metadata.permissions().mode() & 0o777)
}

fn set_mode(path: &Path, mode: u32) -> Result<(), EventStoreError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| EventStoreError::Open(format!("failed to chmod {}: {e}", path.display())))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
