//! Configuration file loading.
//!
//! Settings live in a YAML file (`pipetrend.yaml` by default). A missing
//! file yields the defaults, so the tool works with no setup beyond login.
//! String values may reference environment variables with `${VAR}` or
//! `${VAR:-default}`; `$$` escapes a literal dollar.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::gitlab::{DEFAULT_MAX_PAGES, DEFAULT_REQUEST_TIMEOUT};
use crate::report::JobRules;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pipetrend.yaml";

/// Settings directory name under the home directory.
const STORAGE_DIR_NAME: &str = ".pipetrend";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Directory holding settings files. Defaults to `~/.pipetrend`.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub gitlab: GitLabConfig,
    #[serde(default)]
    pub jobs: JobRules,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let expanded = expand_env_vars(&contents)?;
        Ok(serde_saphyr::from_str(&expanded)?)
    }

    /// The settings directory, resolving the home-relative default.
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage_dir {
            Some(dir) => dir.clone(),
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(STORAGE_DIR_NAME)
            }
        }
    }
}

// ============================================================================
// GitLab section
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GitLabConfig {
    /// Project path used when the CLI gets no `--project`.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            project: None,
            max_pages: default_max_pages(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl GitLabConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        if let Some(tail) = rest.strip_prefix('$') {
            // "$$" escapes a literal dollar
            result.push('$');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('{') {
            let end = tail.find('}').ok_or(ConfigError::UnclosedVarReference)?;
            result.push_str(&resolve_var(&tail[..end])?);
            rest = &tail[end + 1..];
        } else {
            // Bare '$' stays literal
            result.push('$');
        }
    }

    result.push_str(rest);
    Ok(result)
}

/// Resolve the inside of a `${...}` reference, honoring `:-` defaults.
fn resolve_var(reference: &str) -> Result<String, ConfigError> {
    let (name, default) = match reference.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };

    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(_) => default
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string())),
    }
}
