//! Viewer configuration
//!
//! Stored as pretty JSON next to the assets. Every field has a default so a
//! partial file is accepted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::animation::track::DuplicateTrackPolicy;
use crate::core::error::Error;
use crate::core::types::Result;

/// Animation tick used by the reference clips (30 frames per second).
pub const DEFAULT_TICK_SECONDS: f32 = 1.0 / 30.0;

/// Runtime settings for the skinning viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Asset to import (glTF / GLB, or an export directory)
    pub asset: PathBuf,
    /// Which animation clip of the asset to play
    pub clip: usize,
    /// Seconds per animation frame
    pub tick_seconds: f32,
    /// Override for the number of frames to loop over (defaults to the clip length)
    pub frame_count: Option<u32>,
    /// What to do when two channels target the same node
    pub duplicate_tracks: DuplicateTrackPolicy,
    /// Static camera eye position
    pub eye: [f32; 3],
    /// Static camera focus point
    pub focus: [f32; 3],
    /// Camera up vector
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset: PathBuf::from("assets/model.glb"),
            clip: 0,
            tick_seconds: DEFAULT_TICK_SECONDS,
            frame_count: None,
            duplicate_tracks: DuplicateTrackPolicy::LastWins,
            eye: [-0.25, -1.5, -1.0],
            focus: [-0.25, -0.5, -0.9],
            up: [0.0, 0.0, -1.0],
            fov_y_degrees: 45.0,
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl ViewerConfig {
    /// Check values that would make the viewer misbehave
    pub fn validate(&self) -> Result<()> {
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(Error::Config(format!(
                "tick_seconds must be positive, got {}",
                self.tick_seconds
            )));
        }
        if self.frame_count == Some(0) {
            return Err(Error::Config("frame_count must be at least 1".to_string()));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::Config("window size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}
