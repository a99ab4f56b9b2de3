//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the metarelay binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};

/// Start building an invocation of the metarelay binary.
pub fn cli() -> Spec {
    Spec {
        cmd: assert_cmd::Command::cargo_bin("metarelay").unwrap(),
    }
}

pub struct Spec {
    cmd: assert_cmd::Command,
}

impl Spec {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and require exit code 0.
    pub fn passes(mut self) -> SpecOutput {
        let output = self.cmd.output().unwrap();
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        SpecOutput::from(output)
    }

    /// Run and require a non-zero exit code.
    pub fn fails(mut self) -> SpecOutput {
        let output = self.cmd.output().unwrap();
        assert!(
            !output.status.success(),
            "expected failure, got exit 0\nstdout: {}",
            String::from_utf8_lossy(&output.stdout),
        );
        SpecOutput::from(output)
    }
}

pub struct SpecOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for SpecOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl SpecOutput {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "stdout missing {needle:?}\nstdout: {}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr.contains(needle),
            "stderr missing {needle:?}\nstderr: {}",
            self.stderr
        );
        self
    }
}

/// Write a config file into `dir` pointing the state database there too.
pub fn write_config(dir: &Path, repos: &[(&str, &str)]) -> PathBuf {
    let db_path = dir.join("relay.db");
    let mut contents = format!(
        "cloud:\n  supabase_url: https://test.supabase.co\n  supabase_key: test-key\ndb_path: {}\nrepos:\n",
        db_path.display()
    );
    for (name, path) in repos {
        contents.push_str(&format!("  - name: {name}\n    path: {path}\n"));
    }
    let config_path = dir.join("config.yaml");
    std::fs::write(&config_path, contents).unwrap();
    config_path
}

/// Seed a cursor row the way the store writes it.
pub fn seed_cursor(dir: &Path, repo: &str, last_event_id: i64) {
    let conn = rusqlite::Connection::open(dir.join("relay.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cursor (
            repo TEXT PRIMARY KEY,
            last_event_id INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO cursor (repo, last_event_id, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(repo) DO UPDATE SET last_event_id = excluded.last_event_id",
        rusqlite::params![repo, last_event_id, "2026-01-01T00:00:00+00:00"],
    )
    .unwrap();
}
