//! Config file discovery, loading and first-run creation.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::Config;
use crate::errors::ConfigError;

/// Environment variable that overrides `geocoding.api_key`.
pub const GEOCODING_KEY_ENV: &str = "OPENCAGE_KEY";

const CONFIG_DIR_NAME: &str = "tourdex";
const CONFIG_FILE_NAME: &str = "config.toml";

/// `<config dir>/tourdex/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|path| path.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let write_error = |message: String| ConfigError::Write {
        path: path.display().to_string(),
        message,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| write_error(err.to_string()))?;
    }
    let text = toml::to_string(config).map_err(|err| write_error(err.to_string()))?;
    fs::write(path, text).map_err(|err| write_error(err.to_string()))
}

/// Loads `path`, writing defaults on first run.
///
/// A broken file is reported and replaced by defaults in memory only, so the
/// user's edits are never overwritten.
pub fn load_or_create_config(path: &Path) -> Config {
    if !path.exists() {
        let config = Config::default();
        match write_config(path, &config) {
            Ok(()) => info!("Wrote default config to {}", path.display()),
            Err(err) => warn!("{}", err),
        }
        return config;
    }
    match read_config(path) {
        Ok(config) => config,
        Err(err) => {
            warn!("{}; using defaults", err);
            Config::default()
        }
    }
}

/// Applies process-environment overrides on top of the file config.
pub fn apply_env_overrides(config: &mut Config, env_key: Option<String>) {
    if let Some(key) = env_key.filter(|key| !key.trim().is_empty()) {
        config.geocoding.api_key = Some(key.trim().to_string());
    }
}

pub fn load_runtime_config(explicit_path: Option<&Path>) -> Config {
    let mut config = match explicit_path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => load_or_create_config(&path),
        None => {
            warn!("No config directory available; using defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config, std::env::var(GEOCODING_KEY_ENV).ok());
    config
}
