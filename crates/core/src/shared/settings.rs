use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, LEFT_CAMERA_SERIAL, MAX_CONSECUTIVE_TIMEOUTS,
    RETRIEVE_TIMEOUT_MS, RIGHT_CAMERA_SERIAL, YOLO_MODEL_URL,
};

/// Default detector confidence threshold.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Runtime knobs for a detection run.
///
/// Defaults reproduce the reference rig: two fixed serials, 5 s retrieve
/// timeout, 960x600 display windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSettings {
    pub left_serial: String,
    pub right_serial: String,
    pub retrieve_timeout_ms: u32,
    pub max_consecutive_timeouts: u32,
    pub confidence: f32,
    pub display_width: u32,
    pub display_height: u32,
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub max_iterations: Option<usize>,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            left_serial: LEFT_CAMERA_SERIAL.to_string(),
            right_serial: RIGHT_CAMERA_SERIAL.to_string(),
            retrieve_timeout_ms: RETRIEVE_TIMEOUT_MS,
            max_consecutive_timeouts: MAX_CONSECUTIVE_TIMEOUTS,
            confidence: DEFAULT_CONFIDENCE,
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
            model_path: None,
            model_url: Some(YOLO_MODEL_URL.to_string()),
            max_iterations: None,
        }
    }
}

impl PresenceSettings {
    /// Loads settings from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn retrieve_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.retrieve_timeout_ms))
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.left_serial.is_empty() || self.right_serial.is_empty() {
            return Err(SettingsError::Invalid(
                "Camera serial numbers must not be empty".into(),
            ));
        }
        if self.left_serial == self.right_serial {
            return Err(SettingsError::Invalid(format!(
                "Left and right cameras must differ, both are '{}'",
                self.left_serial
            )));
        }
        if self.retrieve_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "Retrieve timeout must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SettingsError::Invalid(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )));
        }
        if self.display_width == 0 || self.display_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "Display size must be non-zero, got {}x{}",
                self.display_width, self.display_height
            )));
        }
        Ok(())
    }
}
