//! Application configuration loading.
//!
//! Reads `windcode.yaml` and resolves environment variables. Every section is
//! optional: a missing file or a missing key falls back to the defaults below,
//! which target LM Studio on `localhost:1234` and a local SQLite store.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::agent_core::types::ContinuationPolicy;

// ─── Constants ───────────────────────────────────────────────────────────────

/// File name searched for when no explicit `--config` path is given.
pub const CONFIG_FILE_NAME: &str = "windcode.yaml";

/// Env var pointing at the directory that holds `windcode.yaml`.
pub const PROJECT_ROOT_ENV: &str = "WINDCODE_PROJECT_ROOT";

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_MODEL: &str = "llama-3.2-3b-instruct-abliterated";

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    Parse { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `windcode.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub relay: ContinuationPolicy,
    pub workspace: WorkspaceConfig,
    pub echo: EchoConfig,
    pub logging: LoggingConfig,
}

/// OpenAI-compatible model endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Total request timeout. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            request_timeout_secs: None,
        }
    }
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Rest,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Defaults to `<data_dir>/windcode.db`.
    pub sqlite_path: Option<String>,
    /// Base URL of the hosted project, e.g. `https://xyz.supabase.co`.
    pub rest_url: Option<String>,
    pub rest_anon_key: Option<String>,
}

impl StorageConfig {
    /// `rest_url`, treating an empty interpolation result as unset.
    pub fn rest_url(&self) -> Option<&str> {
        self.rest_url.as_deref().filter(|s| !s.is_empty())
    }

    pub fn rest_anon_key(&self) -> Option<&str> {
        self.rest_anon_key.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Project to open. Takes precedence over the cached id in `state.json`.
    pub project_id: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            poll_interval_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub reply_delay_ms: u64,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` overrides it.
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "windcode=info,warn".to_string(),
            json: false,
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate `windcode.yaml`.
///
/// Checks `WINDCODE_PROJECT_ROOT` first, then walks upward from `start`.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let candidate = PathBuf::from(&root).join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse a configuration file.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}` before parsing.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_config(&raw)
}

/// Parse configuration text. An empty document yields the defaults.
pub fn parse_config(raw: &str) -> Result<AppConfig, ConfigError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })
}

/// Resolve the configuration the binary runs with.
///
/// An explicit path must exist. Without one, the discovered file is used if
/// present, otherwise the defaults. Returns the path that was loaded, if any.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().unwrap_or_default();
            find_config_path(&cwd)
        }
    };

    match path {
        Some(p) => {
            let config = load_config(&p)?;
            Ok((config, Some(p)))
        }
        None => Ok((AppConfig::default(), None)),
    }
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
