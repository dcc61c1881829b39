//! Server configuration
//!
//! Start-up settings are read from a RON file. The subset that can change
//! while the server runs lives in [`InteractiveSettings`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Longest accepted wait for a transform lookup, in seconds
pub const MAX_TRANSFORM_TIMEOUT_SECS: f64 = 3600.0;

/// Settings applied to every registered object on live reconfiguration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InteractiveSettings {
    /// Show the six axis handles around each object
    pub display_interactive_manipulator: bool,
}

impl Default for InteractiveSettings {
    fn default() -> Self {
        Self {
            display_interactive_manipulator: true,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Name of the interactive marker topic namespace
    pub server_name: String,
    /// Initial manipulator display setting for inserted objects
    pub display_interactive_manipulator: bool,
    /// Torus tessellation around the main ring
    pub torus_udiv: u32,
    /// Torus tessellation around the tube
    pub torus_vdiv: u32,
    /// Bounded wait for transform lookups, in seconds
    pub transform_timeout_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "simple_marker".to_string(),
            display_interactive_manipulator: true,
            torus_udiv: 20,
            torus_vdiv: 20,
            transform_timeout_secs: 1.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: ServerConfig =
            ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load configuration if the file exists and parses, defaults otherwise
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No config file at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config file: {}", e);
            Self::default()
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_TRANSFORM_TIMEOUT_SECS).contains(&self.transform_timeout_secs) {
            return Err(ConfigError::Invalid {
                field: "transform_timeout_secs",
                reason: format!(
                    "{} is outside 0..={}",
                    self.transform_timeout_secs, MAX_TRANSFORM_TIMEOUT_SECS
                ),
            });
        }
        if self.torus_udiv == 0 || self.torus_vdiv == 0 {
            return Err(ConfigError::Invalid {
                field: "torus_udiv/torus_vdiv",
                reason: "tessellation must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Lookup wait; values too large for a `Duration` saturate
    pub fn transform_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.transform_timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Settings handed to newly inserted objects
    pub fn initial_settings(&self) -> InteractiveSettings {
        InteractiveSettings {
            display_interactive_manipulator: self.display_interactive_manipulator,
        }
    }
}
