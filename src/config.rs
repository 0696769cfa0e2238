//! User settings, persisted as JSON in the OS config directory.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::sync::window::DEFAULT_SLACK_MONTHS;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Dataset opened on start and written back after every change.
    pub data_file: Option<PathBuf>,
    /// Months loaded past the date that forces the window to grow.
    pub window_slack_months: u32,
    pub load_all_on_start: bool,
    /// `tracing` filter directives; `PLANNER_LOG` takes precedence.
    pub log_filter: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            window_slack_months: DEFAULT_SLACK_MONTHS,
            load_all_on_start: false,
            log_filter: None,
        }
    }
}

impl PlannerConfig {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from("", "", "WeekPlanner")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(SETTINGS_FILE))
    }

    /// Settings from the platform path. A missing or unreadable file gives
    /// the defaults.
    pub fn load() -> Self {
        let path = match Self::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("{e}; using default settings");
                return Self::default();
            }
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("{e}; using default settings");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Write to the platform path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path()?;
        self.save_to(&path)?;
        Ok(path)
    }
}
