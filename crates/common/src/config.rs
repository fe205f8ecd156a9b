//! Application configuration.
//!
//! Component-level knobs (detector thresholds, assembly encoder settings)
//! live next to their components; this module holds the run-level
//! configuration shared by every invocation. No hidden global state:
//! everything is an explicit value passed at construction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CamsiftError, CamsiftResult};

/// Run-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Camera identity, used to derive collision-free artifact names.
    pub camera: String,

    /// Event consolidation parameters.
    pub consolidation: ConsolidationConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters for merging vendor motion events into incidents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Maximum gap in seconds between two events that still merge into
    /// one incident. Equality merges (inclusive boundary).
    pub gap_tolerance_secs: i64,

    /// Synthesized event length in seconds when a vendor log reports an
    /// end with no matching begin (or the reverse).
    pub default_lookbehind_secs: i64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "camsift=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: "camera".to_string(),
            consolidation: ConsolidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            gap_tolerance_secs: 60,
            default_lookbehind_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Fail fast on caller-supplied values that no later stage can repair.
    pub fn validate(&self) -> CamsiftResult<()> {
        self.consolidation.validate()?;
        if self.camera.trim().is_empty() {
            return Err(CamsiftError::config("camera name must not be empty"));
        }
        Ok(())
    }
}

impl ConsolidationConfig {
    pub fn validate(&self) -> CamsiftResult<()> {
        if self.gap_tolerance_secs < 0 {
            return Err(CamsiftError::config(format!(
                "gap_tolerance_secs must be non-negative, got {}",
                self.gap_tolerance_secs
            )));
        }
        if self.default_lookbehind_secs <= 0 {
            return Err(CamsiftError::config(format!(
                "default_lookbehind_secs must be positive, got {}",
                self.default_lookbehind_secs
            )));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("camsift").join("config.json")
}
