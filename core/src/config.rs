use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

/// Path of the host configuration file.
pub const CONFIG_ENV: &str = "COLCON_HOST_CONFIG";
/// Log filter, e.g. `debug` or `colcon_top_level_workspace=trace`.
pub const LOG_LEVEL_ENV: &str = "COLCON_LOG_LEVEL";
/// Extension names to skip, separated like `PATH` entries.
pub const BLOCKLIST_ENV: &str = "COLCON_EXTENSION_BLOCKLIST";

const LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Runtime configuration resolved from file and environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostConfig {
    pub log_level: String,
    /// Decorator extensions that are registered but not applied.
    pub blocklist: Vec<String>,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    logging: FileLogging,
    #[serde(default)]
    extensions: FileExtensions,
}

#[derive(Deserialize)]
struct FileLogging {
    #[serde(default = "default_log_level")]
    level: String,
}

#[derive(Deserialize, Default)]
struct FileExtensions {
    #[serde(default)]
    blocklist: Vec<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for FileLogging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            blocklist: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Resolve configuration from environment variables, config file and
    /// defaults.
    pub fn load() -> Result<Self> {
        // config file path precedence: ENV -> platform config dir
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);
        Self::load_from(path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            if let Ok(bytes) = fs::read(path) {
                let contents = String::from_utf8_lossy(&bytes);
                let file_cfg: FileConfig = toml::from_str(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))?;
                config.log_level = file_cfg.logging.level;
                config.blocklist = file_cfg.extensions.blocklist;
            }
        }

        // environment overrides
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.is_empty() {
                config.log_level = level;
            }
        }
        if let Ok(list) = std::env::var(BLOCKLIST_ENV) {
            config.blocklist = list
                .split(LIST_SEPARATOR)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }
}

/// `host.toml` in the platform specific colcon config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "colcon", "colcon").map(|dirs| dirs.config_dir().join("host.toml"))
}
