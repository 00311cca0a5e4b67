use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::config::{AnimConfig, CachePolicy};

/// Directory name under the platform config/data roots
const APP_DIR: &str = "scrollplay";
/// Optional animation settings file
pub const SETTINGS_FILE: &str = "scrollplay.json";
/// Default log file name for `--log` without a value
pub const LOG_FILE: &str = "scrollplay.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (SCROLLPLAY_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("SCROLLPLAY_CONFIG_DIR")
                .ok()
                .map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. SCROLLPLAY_CONFIG_DIR environment variable
/// 3. Platform-specific config directory from dirs-next (default)
///
/// Platform paths:
/// - Linux: ~/.config/scrollplay/{name}
/// - macOS: ~/Library/Application Support/scrollplay/{name}
/// - Windows: %APPDATA%\scrollplay\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (logs)
///
/// Same priority as `config_file`, rooted at the platform data directory.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

/// Runtime-adjustable part of the settings file. Frame sizing, preload
/// window and overlay timing are build-time constants and are rejected here.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Settings {
    cache_policy: CachePolicy,
}

/// Load `scrollplay.json` from the config directory on top of the reference
/// settings. A missing file leaves the reference settings untouched.
pub fn load_settings(config: &PathConfig) -> Result<AnimConfig> {
    let path = config_file(SETTINGS_FILE, config);
    if !path.exists() {
        log::debug!("No settings at {}, using defaults", path.display());
        return Ok(AnimConfig::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
    log::info!("Loaded settings from {}: {:?}", path.display(), settings);
    Ok(AnimConfig {
        cache_policy: settings.cache_policy,
        ..AnimConfig::default()
    })
}

/// Resolve the frames directory
///
/// Priority: CLI argument → SCROLLPLAY_FRAMES_DIR → None
pub fn frames_dir(cli_dir: Option<PathBuf>) -> Option<PathBuf> {
    cli_dir.or_else(|| {
        std::env::var("SCROLLPLAY_FRAMES_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    })
}

/// Get the configuration directory
fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = dirs_next::config_dir() {
        return dir.join(APP_DIR);
    }
    // Fallback: "." if everything else fails
    PathBuf::from(".")
}

/// Get the data directory
fn get_data_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = dirs_next::data_dir() {
        return dir.join(APP_DIR);
    }
    PathBuf::from(".")
}
