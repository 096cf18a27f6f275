// src/config.rs

//! Configuration loading utilities.
//!
//! Settings that can come from several places are resolved through one
//! precedence chain: explicit override > config file > environment > default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::StorageDirs;

/// Environment variable naming the root data directory.
pub const DATA_DIR_ENV: &str = "ROOMSCOUT_DATA_DIR";

/// Environment variable naming the log level.
pub const LOG_LEVEL_ENV: &str = "ROOMSCOUT_LOG";

const DEFAULT_DATA_DIR: &str = ".data";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    /// Value of `name`; unset and empty are both `None`.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// First present value in precedence order.
pub fn resolve<T>(
    explicit: Option<T>,
    file: Option<T>,
    env: Option<T>,
    default: impl FnOnce() -> T,
) -> T {
    explicit.or(file).or(env).unwrap_or_else(default)
}

/// Load configuration from a TOML file and validate it.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(AppError::config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    let config = Config::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Resolve the private and common data directories for a config.
pub fn storage_dirs(config: &Config, explicit: Option<PathBuf>, env: &dyn EnvSource) -> StorageDirs {
    let data_dir = resolve(
        explicit,
        config.storage.data_dir.as_ref().map(PathBuf::from),
        env.var(DATA_DIR_ENV).map(PathBuf::from),
        || PathBuf::from(DEFAULT_DATA_DIR),
    );
    StorageDirs::new(data_dir, &config.storage.run_name)
}

/// Resolve the log level for a config.
pub fn log_level(config: &Config, explicit: Option<&str>, env: &dyn EnvSource) -> String {
    resolve(
        explicit.map(str::to_string),
        config.logging.level.clone(),
        env.var(LOG_LEVEL_ENV),
        || DEFAULT_LOG_LEVEL.to_string(),
    )
}
