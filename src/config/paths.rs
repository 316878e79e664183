//! XDG base directories for config and data.

use crate::error::ApiError;
use directories::BaseDirs;
use std::path::PathBuf;

pub const APP_DIR: &str = "scriptdeploy";

fn from_env(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `$XDG_CONFIG_HOME`, falling back to the platform config directory.
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Some(path) = from_env("XDG_CONFIG_HOME") {
        return Ok(path);
    }
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ApiError::ConfigError("Could not determine config directory".to_string()))
}

/// `$XDG_DATA_HOME`, falling back to the platform data directory.
pub fn data_home() -> Result<PathBuf, ApiError> {
    if let Some(path) = from_env("XDG_DATA_HOME") {
        return Ok(path);
    }
    BaseDirs::new()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| ApiError::ConfigError("Could not determine data directory".to_string()))
}

/// `<data home>/scriptdeploy`
pub fn app_data_dir() -> Result<PathBuf, ApiError> {
    Ok(data_home()?.join(APP_DIR))
}

/// `<config home>/scriptdeploy/config.toml`
pub fn global_config_file() -> Result<PathBuf, ApiError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}
