use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::constants::DEFAULT_UNIT_IMAGE;

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub unit: UnitConfig,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    #[serde(default = "default_unit_image")]
    pub image: String,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            image: default_unit_image(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            unit: UnitConfig::default(),
            log_dir: default_log_dir(),
        }
    }
}

impl PoolConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config at {}: {}", path.display(), e))?;
        let mut config: PoolConfig = serde_json::from_str(&data)
            .map_err(|e| anyhow!("Failed to parse config JSON at {}: {}", path.display(), e))?;

        config.unit.image = config.unit.image.trim().to_string();
        if config.unit.image.is_empty() {
            config.unit.image = default_unit_image();
        }

        config.log_dir = config.log_dir.trim().to_string();
        if config.log_dir.is_empty() {
            config.log_dir = default_log_dir();
        }

        Ok(config)
    }

    /// Loads the config file if present, otherwise defaults. The
    /// `DRIVEPOOL_UNIT_IMAGE` environment variable wins over both.
    pub fn load_default() -> Result<(Self, PathBuf)> {
        let path = resolve_config_path();
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };

        if let Ok(image) = std::env::var("DRIVEPOOL_UNIT_IMAGE") {
            let image = image.trim();
            if !image.is_empty() {
                config.unit.image = image.to_string();
            }
        }

        Ok((config, path))
    }
}

fn default_unit_image() -> String {
    DEFAULT_UNIT_IMAGE.to_string()
}

fn default_log_dir() -> String {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drivepool")
        .join("logs")
        .to_string_lossy()
        .into_owned()
}

pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DRIVEPOOL_CONFIG_PATH") {
        return expand_path(path);
    }

    default_config_path()
}

fn expand_path(input: String) -> PathBuf {
    if let Some(stripped) = input.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    } else if let Some(stripped) = input.strip_prefix("~\\") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(input)
}

fn default_config_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drivepool")
        .join("drivepool.json")
}

fn home_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    } else {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}
