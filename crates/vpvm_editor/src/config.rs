// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration stored as RON.

use crate::history::DEFAULT_HISTORY_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vpvm_motion::{InterpolationPreset, DEFAULT_FRAME_RATE};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "vpvm.ron";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Configuration could not be written
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undoable edits
    pub history_depth: usize,
    /// Interpolation applied to newly registered keyframes
    pub default_preset: InterpolationPreset,
    /// Frame rate of new motions
    pub frame_rate: f32,
    /// Length of the recent projects list
    pub max_recent_projects: usize,
    /// Recently opened projects, newest first
    pub recent_projects: Vec<PathBuf>,
    /// Write indented project files
    pub pretty_project_files: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            default_preset: InterpolationPreset::Linear,
            frame_rate: DEFAULT_FRAME_RATE,
            max_recent_projects: 10,
            recent_projects: Vec::new(),
            pretty_project_files: true,
        }
    }
}

impl EditorConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = ron::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save the configuration
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.history_depth == 0 {
            return Err(ConfigError::Invalid("history_depth must be at least 1".to_string()));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        Ok(())
    }

    /// Add a project to the recent projects list
    pub fn add_recent(&mut self, path: PathBuf) {
        self.recent_projects.retain(|p| p != &path);
        self.recent_projects.insert(0, path);
        self.recent_projects.truncate(self.max_recent_projects);
    }
}
