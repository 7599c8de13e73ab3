use std::path::PathBuf;

use pulse_app::config::load_or_create;
use pulse_app::{AppPaths, ConfigLoad, Result};

/// Loads the config from `--config`, or from the per-user config directory.
pub fn load(explicit: Option<PathBuf>) -> Result<ConfigLoad> {
    let path = match explicit {
        Some(path) => path,
        None => AppPaths::resolve()?.config_path,
    };
    load_or_create(&path)
}
