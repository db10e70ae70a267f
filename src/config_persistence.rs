use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};

pub const CACHE_DIR_ENV: &str = "ROMCOVER_CACHE_DIR";
const APP_DIR_NAME: &str = "romcover";
const CONFIG_FILE_NAME: &str = "config.toml";

pub fn system_config_template_text() -> &'static str {
    include_str!("../config/config.system.toml")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Reads `path`, writing the commented template first when the file does not exist.
///
/// A file that exists but does not parse is reported and replaced by defaults
/// in memory; it is never overwritten.
pub fn load_or_create_config(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "failed to create config directory {}: {}",
                    parent.display(),
                    err
                )
            })?;
        }
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        std::fs::write(path, system_config_template_text())
            .map_err(|err| format!("failed to write default config {}: {}", path.display(), err))?;
    }

    let config_content = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let parsed = match toml::from_str::<Config>(&config_content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config {} ({}). Using defaults.",
                path.display(),
                err
            );
            Config::default()
        }
    };
    Ok(sanitize_config(parsed))
}

/// Picks the icon cache directory: explicit override, then the environment,
/// then the config file, then the platform cache dir.
pub fn resolve_cache_dir(config: &Config, override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = config.cache_directory() {
        return dir;
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join("icons")
}
