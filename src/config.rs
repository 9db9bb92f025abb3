//! Engine configuration.
//!
//! Loads settings from config.json at startup. Every field has a default, so
//! a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogSink;

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spacing between detection polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Spacing between replayed frames (milliseconds)
    pub frame_interval_ms: u64,
    /// Image file or directory of images replayed as the live feed
    pub frame_source: Option<PathBuf>,
    /// Overrides `<exe_dir>/calibration`
    pub calibration_dir: Option<PathBuf>,
    /// Light sensor level reported by the dry-run controller (0-1020)
    pub dry_run_light_level: u16,
    /// Routine started when none is named on the command line
    pub routine: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30,
            frame_interval_ms: 33,
            frame_source: None,
            calibration_dir: None,
            dry_run_light_level: 512,
            routine: None,
        }
    }
}

impl EngineConfig {
    /// Loads `path`, falling back to defaults when it is missing or invalid.
    pub fn load(path: &Path, log: &dyn LogSink) -> Self {
        log.append(&format!("Looking for config at: {}", path.display()));

        if !path.exists() {
            log.append("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log.append("Config loaded from config.json");
                    config
                }
                Err(e) => {
                    log.append(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                log.append(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
                Self::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// Calibration directory, defaulting to `<exe_dir>/calibration`.
    pub fn calibration_dir(&self) -> PathBuf {
        self.calibration_dir
            .clone()
            .unwrap_or_else(crate::paths::get_calibration_dir)
    }
}
