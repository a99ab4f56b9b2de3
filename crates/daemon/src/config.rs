// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading and validation
//!
//! YAML mapping loaded from `~/.metarelay/config.yaml` by default.
//! `METARELAY_SUPABASE_URL` and `METARELAY_SUPABASE_KEY` override the
//! corresponding `cloud` keys when set.

use metarelay_core::{ConfigError, HandlerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "~/.metarelay/config.yaml";

const ENV_SUPABASE_URL: &str = "METARELAY_SUPABASE_URL";
const ENV_SUPABASE_KEY: &str = "METARELAY_SUPABASE_KEY";

fn default_db_path() -> String {
    "~/.metarelay/metarelay.db".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

/// Cloud backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase anon/service key
    pub supabase_key: String,
    /// Webhook secret; held for the ingestion side, unused by the relay
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// A watched repository.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    /// Full repo name, "owner/name" form
    pub name: String,
    /// Local checkout path
    pub path: String,
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cloud: CloudConfig,
    /// Repos to watch
    pub repos: Vec<RepoConfig>,
    /// Handler rules registered at startup
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
    /// State database path
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Logging verbosity
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Watched repo name strings, in configuration order.
    pub fn repo_names(&self) -> Vec<String> {
        self.repos.iter().map(|r| r.name.clone()).collect()
    }

    /// Local checkout path for a repo, if one is configured.
    pub fn repo_path(&self, repo_name: &str) -> Option<&str> {
        self.repos
            .iter()
            .find(|r| r.name == repo_name)
            .map(|r| r.path.as_str())
    }
}

/// Load and validate configuration from a YAML file.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => expand_tilde(DEFAULT_CONFIG_PATH),
    };

    if !config_path.exists() {
        return Err(ConfigError::NotFound(config_path));
    }

    let raw = std::fs::read_to_string(&config_path)?;

    let mut data: serde_yaml::Value =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Yaml(e.to_string()))?;
    if !data.is_mapping() {
        return Err(ConfigError::Invalid(
            "config file must contain a YAML mapping".to_string(),
        ));
    }

    apply_env_overrides(&mut data);

    let config: Config =
        serde_yaml::from_value(data).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Overlay `METARELAY_SUPABASE_URL`/`METARELAY_SUPABASE_KEY` onto the
/// raw mapping, creating the `cloud` section if the file omitted it.
fn apply_env_overrides(data: &mut serde_yaml::Value) {
    let overrides = [
        (ENV_SUPABASE_URL, "supabase_url"),
        (ENV_SUPABASE_KEY, "supabase_key"),
    ];

    for (env_name, key) in overrides {
        let Some(value) = std::env::var(env_name).ok().filter(|v| !v.is_empty()) else {
            continue;
        };
        let Some(mapping) = data.as_mapping_mut() else {
            return;
        };
        let cloud = mapping
            .entry("cloud".into())
            .or_insert_with(|| serde_yaml::Value::Mapping(Default::default()));
        if let Some(cloud) = cloud.as_mapping_mut() {
            cloud.insert(key.into(), value.into());
        }
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    for repo in &config.repos {
        if !is_valid_repo_name(&repo.name) {
            return Err(ConfigError::Invalid(format!(
                "invalid repo format: {:?}. Expected 'owner/repo'.",
                repo.name
            )));
        }
    }
    for handler in &config.handlers {
        if handler.timeout == 0 {
            return Err(ConfigError::Invalid(format!(
                "handler {:?} has a zero timeout",
                handler.name
            )));
        }
    }
    Ok(())
}

/// Exactly one slash with non-empty halves.
fn is_valid_repo_name(name: &str) -> bool {
    let mut parts = name.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
    )
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
