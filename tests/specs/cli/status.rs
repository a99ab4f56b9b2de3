//! `status` command specs

use crate::prelude::*;
use tempfile::TempDir;

#[test]
fn status_without_cursors_reports_unsynced_repos() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &[("owner/alpha", "/src/alpha"), ("owner/beta", "/src/beta")],
    );

    cli()
        .args(&["status", "-c", config.to_str().unwrap()])
        .passes()
        .stdout_has("Metarelay Status")
        .stdout_has("owner/alpha: no cursor (not yet synced)")
        .stdout_has("owner/beta: no cursor (not yet synced)");
}

#[test]
fn status_reports_seeded_cursor() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &[("owner/repo", "/src/repo")]);
    seed_cursor(dir.path(), "owner/repo", 7);

    cli()
        .args(&["status", "-c", config.to_str().unwrap()])
        .passes()
        .stdout_has("owner/repo: last_event_id=7");
}
