use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// One named profile from the TOML config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    pub model: Option<String>,
    pub models: Option<Vec<String>>,
    pub attempts: Option<u32>,
    pub backoff: Option<u64>,
    pub timeout: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub persona: Option<bool>,
    pub output: Option<String>,
    pub show_usage: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;

    profiles.get(name).cloned().ok_or_else(|| {
        format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        )
    })
}

/// Parses the config file and checks the given (or every) profile.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;

    match profile {
        Some(name) => {
            let profile = profiles.get(name).ok_or_else(|| {
                format!(
                    "Profile '{}' not found in config file '{}'.",
                    name,
                    path.display()
                )
            })?;
            validate_profile(profile)?;
        }
        None => {
            for profile in profiles.values() {
                validate_profile(profile)?;
            }
        }
    }

    Ok(path)
}

pub fn validate_profile(profile: &ProfileConfig) -> Result<(), String> {
    if let Some(output) = &profile.output {
        if output != "text" && output != "json" {
            return Err(format!(
                "Invalid profile output '{output}'. Supported values: text, json."
            ));
        }
    }
    if let Some(models) = &profile.models {
        if models.is_empty() {
            return Err("Profile 'models' list must not be empty.".to_string());
        }
    }
    if profile.attempts == Some(0) {
        return Err("Profile 'attempts' must be at least 1.".to_string());
    }
    Ok(())
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;

    let config: ConfigFile = toml::from_str(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))?;

    config.profiles.ok_or_else(|| {
        format!(
            "Config file '{}' does not contain a [profiles] section.",
            path.display()
        )
    })
}

fn config_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var("TS_CONFIG") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed).join("tubestrat").join("config.toml"));
        }
    }

    let home = env::var("HOME").map_err(|_| {
        "Cannot resolve config path: set TS_CONFIG or HOME/XDG_CONFIG_HOME.".to_string()
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("tubestrat")
        .join("config.toml"))
}
