//! Configuration loading with precedence handling.
//!
//! Precedence (lowest to highest): defaults → config file → environment →
//! command line.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::data::results::LayoutMode;
use crate::status::{DEFAULT_CLEAR_DELAY, MAX_CLEAR_DELAY, MIN_CLEAR_DELAY};

/// Default backend address (the FastAPI service listens on port 8000).
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const CONFIG_PATH_ENV: &str = "SHEET_EXPLORER_CONFIG";
pub const API_URL_ENV: &str = "SHEET_EXPLORER_API_URL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Invalid TOML in {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// `~/.config/sheet-explorer/config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// `0` disables the timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// How long ephemeral status messages stay visible. Clamped to
    /// 3000..=4000.
    #[serde(default)]
    pub status_clear_delay_ms: Option<u64>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub default_layout: Option<LayoutMode>,

    /// Ask the service for exact matches instead of substring matches.
    #[serde(default)]
    pub exact_match: Option<bool>,

    #[serde(default)]
    pub capabilities: Option<CapabilitiesSection>,
}

/// ```toml
/// [capabilities]
/// multi_field_search = true
/// column_projection = false
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesSection {
    #[serde(default)]
    pub multi_field_search: Option<bool>,
    #[serde(default)]
    pub column_projection: Option<bool>,
    #[serde(default)]
    pub export: Option<bool>,
    #[serde(default)]
    pub layout_toggle: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Optional client features. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// More than one filter term per search.
    pub multi_field_search: bool,
    /// Restrict the returned columns.
    pub column_projection: bool,
    /// CSV / workbook / PNG export buttons.
    pub export: bool,
    /// Table ↔ card layout switch.
    pub layout_toggle: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            multi_field_search: true,
            column_projection: true,
            export: true,
            layout_toggle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_base_url: String,
    pub request_timeout: Option<Duration>,
    pub status_clear_delay: Duration,
    pub log_level: String,
    pub default_layout: LayoutMode,
    pub exact_match: bool,
    pub capabilities: Capabilities,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            status_clear_delay: DEFAULT_CLEAR_DELAY,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            default_layout: LayoutMode::Tabular,
            exact_match: false,
            capabilities: Capabilities::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sheet-explorer").join("config.toml"))
}

/// Load a config file. A missing file is `Ok(None)`, not an error.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Explicit path first, then `SHEET_EXPLORER_CONFIG`, then the default path.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }
    if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
        return load_config_file(PathBuf::from(env_path));
    }
    match default_config_path() {
        Some(path) => load_config_file(path),
        None => Ok(None),
    }
}

pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();
    let Some(config) = config_file else {
        return defaults;
    };

    let request_timeout = match config.request_timeout_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => defaults.request_timeout,
    };
    let caps = config.capabilities.unwrap_or_default();

    ResolvedConfig {
        api_base_url: config.api_base_url.unwrap_or(defaults.api_base_url),
        request_timeout,
        status_clear_delay: config
            .status_clear_delay_ms
            .map(|ms| Duration::from_millis(ms).clamp(MIN_CLEAR_DELAY, MAX_CLEAR_DELAY))
            .unwrap_or(defaults.status_clear_delay),
        log_level: config.log_level.unwrap_or(defaults.log_level),
        default_layout: config.default_layout.unwrap_or(defaults.default_layout),
        exact_match: config.exact_match.unwrap_or(defaults.exact_match),
        capabilities: Capabilities {
            multi_field_search: caps
                .multi_field_search
                .unwrap_or(defaults.capabilities.multi_field_search),
            column_projection: caps
                .column_projection
                .unwrap_or(defaults.capabilities.column_projection),
            export: caps.export.unwrap_or(defaults.capabilities.export),
            layout_toggle: caps
                .layout_toggle
                .unwrap_or(defaults.capabilities.layout_toggle),
        },
    }
}

/// `SHEET_EXPLORER_API_URL` overrides the backend address.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(url) = std::env::var(API_URL_ENV) {
        config.api_base_url = url;
    }
    config
}

/// Flags given on the command line win over everything else.
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    api_url_override: Option<String>,
    log_level_override: Option<String>,
) -> ResolvedConfig {
    if let Some(url) = api_url_override {
        config.api_base_url = url;
    }
    if let Some(level) = log_level_override {
        config.log_level = level;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        (dir, path)
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        if let Some(path) = default_config_path() {
            let path = path.to_string_lossy().into_owned();
            assert!(path.contains("sheet-explorer") && path.ends_with("config.toml"), "{path}");
        }
    }

    #[test]
    fn missing_file_is_not_an_error() {
        assert_eq!(load_config_file("/nonexistent/sheet-explorer.toml"), Ok(None));
    }

    #[test]
    fn parses_every_key() {
        let (_dir, path) = write_config(
            r#"
api_base_url = "https://sheets.example.org"
request_timeout_secs = 0
status_clear_delay_ms = 4000
log_level = "debug"
default_layout = "per-record"
exact_match = true

[capabilities]
column_projection = false
"#,
        );

        let resolved = merge_config(load_config_file(&path).unwrap());
        assert_eq!(resolved.api_base_url, "https://sheets.example.org");
        assert_eq!(resolved.request_timeout, None);
        assert_eq!(resolved.status_clear_delay, Duration::from_millis(4000));
        assert_eq!(resolved.log_level, "debug");
        assert_eq!(resolved.default_layout, LayoutMode::PerRecord);
        assert!(resolved.exact_match);
        assert!(!resolved.capabilities.column_projection);
        assert!(resolved.capabilities.multi_field_search);
    }

    #[test]
    fn clear_delay_is_clamped() {
        for (ms, expected) in [(500, 3000), (3200, 3200), (60_000, 4000)] {
            let file = ConfigFile {
                status_clear_delay_ms: Some(ms),
                ..ConfigFile::default()
            };
            assert_eq!(
                merge_config(Some(file)).status_clear_delay,
                Duration::from_millis(expected)
            );
        }
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let (_dir, path) = write_config("api_base_url = [unclosed");
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_config("theme = \"dark\"");
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn no_file_gives_defaults() {
        assert_eq!(merge_config(None), ResolvedConfig::default());
    }

    #[test]
    #[serial]
    fn env_overrides_file() {
        let file = ConfigFile {
            api_base_url: Some("http://from-file".into()),
            ..ConfigFile::default()
        };
        std::env::set_var(API_URL_ENV, "http://from-env");
        let resolved = apply_env_overrides(merge_config(Some(file)));
        std::env::remove_var(API_URL_ENV);

        assert_eq!(resolved.api_base_url, "http://from-env");
    }

    #[test]
    #[serial]
    fn cli_overrides_env() {
        std::env::set_var(API_URL_ENV, "http://from-env");
        let resolved = apply_cli_overrides(
            apply_env_overrides(merge_config(None)),
            Some("http://from-cli".into()),
            Some("warn".into()),
        );
        std::env::remove_var(API_URL_ENV);

        assert_eq!(resolved.api_base_url, "http://from-cli");
        assert_eq!(resolved.log_level, "warn");
    }

    #[test]
    #[serial]
    fn config_env_var_points_at_file() {
        let (_dir, path) = write_config("log_level = \"trace\"");
        std::env::set_var(CONFIG_PATH_ENV, &path);
        let loaded = load_config_with_precedence(None);
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(loaded.unwrap().unwrap().log_level.as_deref(), Some("trace"));
    }
}
