//! CLI help output specs

use crate::prelude::*;

#[test]
fn help_shows_usage_and_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("start")
        .stdout_has("status")
        .stdout_has("sync");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn no_args_shows_usage_and_fails() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn subcommand_help_shows_config_flag() {
    cli()
        .args(&["start", "--help"])
        .passes()
        .stdout_has("--config")
        .stdout_has("--verbose");
}
