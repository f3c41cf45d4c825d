// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::types::DeviceDescriptor;
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_PERIOD_SECS, DEFAULT_REPEATS,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SEARCH_TIMEOUT, SSDP_SEARCH_TARGET,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a discovery run listens for replies (seconds)
    pub search_timeout_secs: u64,
    /// Timeout for each HTTP request to a camera (seconds)
    pub request_timeout_secs: u64,
    /// Capture period offered when none is given
    pub default_period_secs: u32,
    /// Number of pictures offered when none is given
    pub default_repeats: u32,
    /// Focus mode applied right after connecting (e.g. "AF-S", "MF")
    pub focus_mode: Option<String>,
    /// SSDP search target
    pub search_target: String,
    /// Last camera a capture was started on
    pub last_device: Option<DeviceDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_timeout_secs: DEFAULT_SEARCH_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            default_period_secs: DEFAULT_PERIOD_SECS,
            default_repeats: DEFAULT_REPEATS,
            focus_mode: None,
            search_target: SSDP_SEARCH_TARGET.to_string(),
            last_device: None,
        }
    }
}

impl Config {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Location of the user's config file
    pub fn path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the user's config, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!(error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing file gives defaults, an unreadable one
    /// is logged and gives defaults
    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Write to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}
