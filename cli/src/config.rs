//! Settings and state file locations for the CLI.
//!
//! Settings live in `$XDG_CONFIG_HOME/pasteup/settings.toml` and persisted
//! state (upload cache, undo history) in `$XDG_DATA_HOME/pasteup/state.json`,
//! or the platform equivalents.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use pasteup_business::Settings;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "pasteup", "pasteup").context("Failed to determine config directory")
}

/// Default settings file path.
pub fn default_settings_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("settings.toml"))
}

pub fn state_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("state.json"))
}

/// Settings file in use: the explicit path, or the default.
pub fn settings_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_owned()),
        None => default_settings_path(),
    }
}

/// Load settings from `path`.
///
/// Returns default settings if the file doesn't exist.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    parse_settings(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

pub fn parse_settings(content: &str) -> Result<Settings> {
    Ok(toml::from_str(content)?)
}
