//! Config-failure specs: exit code 1 with the error on stderr

use crate::prelude::*;
use tempfile::TempDir;

#[test]
fn missing_config_file_fails_with_message() {
    cli()
        .args(&["status", "-c", "/nonexistent/metarelay.yaml"])
        .fails()
        .stderr_has("Error loading config")
        .stderr_has("not found");
}

#[test]
fn unparseable_yaml_fails_with_message() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "cloud: [unclosed").unwrap();

    cli()
        .args(&["status", "-c", config.to_str().unwrap()])
        .fails()
        .stderr_has("Error loading config");
}

#[test]
fn invalid_repo_name_fails_with_message() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &[("not-a-repo", "/src/repo")]);

    cli()
        .args(&["status", "-c", config.to_str().unwrap()])
        .fails()
        .stderr_has("Error loading config")
        .stderr_has("invalid repo format");
}

#[test]
fn sync_with_missing_config_fails() {
    cli()
        .args(&["sync", "-c", "/nonexistent/metarelay.yaml"])
        .fails()
        .stderr_has("Error loading config");
}
