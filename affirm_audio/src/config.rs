// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Smallest allowed distance between the handles, in percent of the clip.
    pub min_gap_percent: f64,
    pub handle_width_px: f32,
    /// How far from a handle's centre a press still grabs it.
    pub hit_margin_px: f32,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            min_gap_percent: 5.0,
            handle_width_px: 16.0,
            hit_margin_px: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub frame_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

impl TrackerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Input device name; the host default when unset.
    pub device: Option<String>,
    pub ring_capacity: usize,
    /// Samples per bin of the live preview.
    pub preview_bin: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            ring_capacity: 192_000,
            preview_bin: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub global_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { global_volume: 1.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub playlists_path: Option<PathBuf>,
}

impl LibraryConfig {
    pub const DEFAULT_PLAYLISTS_FILE: &'static str = "playlists.json";

    /// Where the playlist library lives; the working directory unless configured.
    pub fn playlists_path(&self) -> PathBuf {
        self.playlists_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_PLAYLISTS_FILE))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub canvas: CanvasConfig,
    pub trim: TrimConfig,
    pub tracker: TrackerConfig,
    pub capture: CaptureConfig,
    pub playback: PlaybackConfig,
    pub library: LibraryConfig,
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.canvas.width == 0 || self.canvas.height == 0 {
            return invalid("canvas dimensions must be non-zero");
        }
        let gap = self.trim.min_gap_percent;
        if !(gap > 0.0 && gap < 100.0) {
            return invalid("trim.min_gap_percent must be inside (0, 100)");
        }
        if self.trim.handle_width_px < 0.0 {
            return invalid("trim.handle_width_px must not be negative");
        }
        if self.trim.hit_margin_px <= self.trim.handle_width_px / 2.0 {
            return invalid("trim.hit_margin_px must reach past the visible handle");
        }
        if self.tracker.frame_interval_ms == 0 {
            return invalid("tracker.frame_interval_ms must be non-zero");
        }
        if self.capture.ring_capacity == 0 || self.capture.preview_bin == 0 {
            return invalid("capture buffers must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.playback.global_volume) {
            return invalid("playback.global_volume must be within [0, 1]");
        }
        Ok(())
    }
}
