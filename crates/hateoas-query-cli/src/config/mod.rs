//! Configuration loading and resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hateoas_query::TraversalConfig;

use crate::types::{CliError, CliResult};

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Settings read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL relative hrefs are resolved against.
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Extra headers sent with every request (e.g. `Authorization`).
    pub headers: BTreeMap<String, String>,
    pub traversal: TraversalConfig,
}

impl CliConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| CliError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }
}

/// Resolve the config file path.
///
/// An explicit path or `HQ_CONFIG` is used as given; the fallbacks are
/// only returned when the file exists.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var("HQ_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".hq.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = default_config_path();
    home_config.exists().then_some(home_config)
}

fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(format!("{home}/.hateoas-query/config.json"))
}

/// Load the effective config, falling back to defaults when no file is found.
pub fn load_config(explicit: Option<&str>) -> CliResult<CliConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!("Loading config: {}", path.display());
            CliConfig::load(&path)
        }
        None => Ok(CliConfig::default()),
    }
}

/// Resolve the base URL: explicit flag, then `HQ_BASE_URL`, then the config file.
pub fn resolve_base_url(explicit: Option<&str>, config: &CliConfig) -> Option<String> {
    if let Some(url) = explicit {
        return Some(url.to_string());
    }

    if let Ok(env_url) = std::env::var("HQ_BASE_URL") {
        return Some(env_url);
    }

    config.base_url.clone()
}
