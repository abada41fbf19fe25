//! Configuration loading and data path resolution
//!
//! Each setting is taken from, in order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent default under the user data directory

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DB_ENV_VAR: &str = "WARDROBE_DB";
pub const IMAGES_ENV_VAR: &str = "WARDROBE_IMAGES";

/// Settings as they appear in `config.toml`; every key is optional
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub catalog_bundle: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
    pub log_filter: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WardrobeConfig {
    pub database_path: PathBuf,
    pub image_dir: PathBuf,
    /// Read-only catalog database copied into place on first run
    pub catalog_bundle: Option<PathBuf>,
    pub busy_timeout: Duration,
    pub log_filter: String,
}

/// Values given on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
}

impl WardrobeConfig {
    /// Resolve configuration from command line, environment, file and defaults
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config_file {
            Some(path) => Some(read_config_file(path)?),
            None => match default_config_file() {
                Some(path) if path.exists() => Some(read_config_file(&path)?),
                _ => None,
            },
        };

        Ok(Self::resolve(
            overrides,
            file.unwrap_or_default(),
            |name| std::env::var(name).ok(),
        ))
    }

    fn resolve(
        overrides: &Overrides,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let data_dir = default_data_dir();

        let database_path = overrides
            .database_path
            .clone()
            .or_else(|| env(DB_ENV_VAR).map(PathBuf::from))
            .or(file.database_path)
            .unwrap_or_else(|| data_dir.join("app.db"));

        let image_dir = overrides
            .image_dir
            .clone()
            .or_else(|| env(IMAGES_ENV_VAR).map(PathBuf::from))
            .or(file.image_dir)
            .unwrap_or_else(|| data_dir.join("images"));

        WardrobeConfig {
            database_path,
            image_dir,
            catalog_bundle: file.catalog_bundle,
            busy_timeout: Duration::from_millis(file.busy_timeout_ms.unwrap_or(5_000)),
            log_filter: file.log_filter.unwrap_or_else(|| "info".to_string()),
        }
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    parse_config(&content)
        .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
}

fn parse_config(content: &str) -> std::result::Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

/// `~/.config/wardrobe/config.toml` on Linux, the platform equivalent elsewhere
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wardrobe").join("config.toml"))
}

/// Get OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("wardrobe"))
        .unwrap_or_else(|| PathBuf::from("./wardrobe_data"))
}
