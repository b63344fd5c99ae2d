//! Library configuration.
//!
//! A small JSON file; every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::scanner::folder::DEFAULT_PROGRESS_EVERY;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No primary folder configured")]
    MissingPrimaryFolder,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for the catalog, its source folders and scanning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Catalog file
    pub database_path: PathBuf,

    /// Descriptor tree to scan. Nothing is scanned while unset.
    pub primary_folder: Option<PathBuf>,

    /// Folder of loose audio files
    pub custom_folder: PathBuf,

    /// Visited files between periodic progress messages (0 = off)
    pub progress_every: usize,

    /// How long a new scan waits for a superseded one to stop
    pub supersede_timeout_ms: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("songs.db"),
            primary_folder: None,
            custom_folder: PathBuf::from("custom_songs"),
            progress_every: DEFAULT_PROGRESS_EVERY,
            supersede_timeout_ms: 5000,
        }
    }
}

impl LibraryConfig {
    /// Load from `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Create the custom folder if it does not exist yet
    pub fn ensure_custom_folder(&self) -> ConfigResult<()> {
        if !self.custom_folder.is_dir() {
            fs::create_dir_all(&self.custom_folder)?;
            info!(folder = %self.custom_folder.display(), "created custom folder");
        }
        Ok(())
    }

    pub fn supersede_timeout(&self) -> Duration {
        Duration::from_millis(self.supersede_timeout_ms)
    }
}
