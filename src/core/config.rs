//! Engine configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::render::Rect;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root folder all content paths are resolved against
    pub content_root: PathBuf,
    /// Sub-folder of `content_root` holding texture images
    pub texture_dir: String,
    /// Sub-folder of `content_root` holding atlas descriptions
    pub atlas_dir: String,
    /// Sub-folder of `content_root` holding texture fonts
    pub font_dir: String,
    /// Sub-folder of `content_root` holding sound effects
    pub sound_dir: String,
    /// Camera rectangle used for culling, in unscaled pixels
    pub viewport: Rect,
    /// Default time a camera takes to close the gap to a new focus (ms)
    pub camera_tween_ms: u32,
    /// Number of simultaneous sound effect instances
    pub sound_pool_capacity: usize,
    /// Minimum time a screen transition holds the screen covered (ms)
    pub transition_hold_ms: u32,
    /// Time a screen transition takes to cover or reveal the screen (ms)
    pub transition_fade_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("Content"),
            texture_dir: String::from("Graphics/Textures"),
            atlas_dir: String::from("Graphics/Atlases"),
            font_dir: String::from("Graphics/Fonts"),
            sound_dir: String::from("Sounds"),
            viewport: Rect::new(0, 0, 320, 180),
            camera_tween_ms: 500,
            sound_pool_capacity: 64,
            transition_hold_ms: 250,
            transition_fade_ms: 300,
        }
    }
}

impl EngineConfig {
    /// Set the content root
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = root.into();
        self
    }

    /// Set the viewport size
    pub fn with_viewport(mut self, width: i32, height: i32) -> Self {
        self.viewport = Rect::new(0, 0, width, height);
        self
    }

    /// Set the sound pool capacity
    pub fn with_sound_pool_capacity(mut self, capacity: usize) -> Self {
        self.sound_pool_capacity = capacity;
        self
    }

    /// Set transition hold and fade durations
    pub fn with_transition_timing(mut self, hold_ms: u32, fade_ms: u32) -> Self {
        self.transition_hold_ms = hold_ms;
        self.transition_fade_ms = fade_ms;
        self
    }

    /// Directory texture images are loaded from
    #[must_use]
    pub fn texture_root(&self) -> PathBuf {
        self.content_root.join(&self.texture_dir)
    }

    /// Directory atlas descriptions are loaded from
    #[must_use]
    pub fn atlas_root(&self) -> PathBuf {
        self.content_root.join(&self.atlas_dir)
    }

    /// Directory texture fonts are loaded from
    #[must_use]
    pub fn font_root(&self) -> PathBuf {
        self.content_root.join(&self.font_dir)
    }

    /// Directory sound effects are loaded from
    #[must_use]
    pub fn sound_root(&self) -> PathBuf {
        self.content_root.join(&self.sound_dir)
    }

    /// Load a configuration from a RON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error
    Io(String),
    /// Parse error
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Parse(e) => write!(f, "Config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_content_root("assets")
            .with_viewport(640, 360)
            .with_sound_pool_capacity(8);

        assert_eq!(config.content_root, PathBuf::from("assets"));
        assert_eq!(config.viewport, Rect::new(0, 0, 640, 360));
        assert_eq!(config.sound_pool_capacity, 8);
        assert_eq!(
            config.atlas_root(),
            PathBuf::from("assets").join("Graphics/Atlases")
        );
    }

    #[test]
    fn test_load_ron_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        fs::write(&path, "(camera_tween_ms: 750, sound_pool_capacity: 4)").unwrap();

        let config = EngineConfig::load_ron(&path).unwrap();
        assert_eq!(config.camera_tween_ms, 750);
        assert_eq!(config.sound_pool_capacity, 4);
        assert_eq!(config.viewport, Rect::new(0, 0, 320, 180));
    }

    #[test]
    fn test_load_ron_missing_file() {
        let result = EngineConfig::load_ron("does/not/exist.ron");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
