use std::path::PathBuf;

use crate::config::PulseConfig;
use crate::error::{AppError, Result};

const APP_DIR_NAME: &str = "repo-pulse";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        Self {
            config_dir,
            config_path,
        }
    }

    /// `$XDG_CONFIG_HOME/repo-pulse`, else `$HOME/.config/repo-pulse`.
    pub fn resolve() -> Result<Self> {
        if let Some(base) = std::env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
            return Ok(Self::new(PathBuf::from(base).join(APP_DIR_NAME)));
        }
        let home = std::env::var_os("HOME")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Config("resolve HOME: not set".to_string()))?;
        Ok(Self::new(PathBuf::from(home).join(".config").join(APP_DIR_NAME)))
    }
}

/// Creates the directory the database lives in.
pub fn ensure_app_dirs(config: &PulseConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
