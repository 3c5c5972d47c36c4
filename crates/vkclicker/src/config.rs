//! # Application Configuration
//!
//! `vkclicker.toml` holds two tables:
//!
//! ```toml
//! [memory]
//! scratch_size = 33554432
//! frame_size = 1048576
//!
//! [render]
//! frames = 600
//! target_fps = 60
//! ```
//!
//! Both tables and every key in them are optional.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vkclicker_mem::{MemError, MemResult, RegistryConfig};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "vkclicker.toml";

/// Render loop settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of iterations the headless loop runs. Zero runs nothing.
    pub frames: u64,
    /// Target frames per second.
    pub target_fps: u32,
    /// Number of recent frame times kept for the rolling average.
    pub history: u32,
    /// Log every frame that exceeds twice the target frame time.
    pub enable_timing_logs: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            target_fps: 60,
            history: 120,
            enable_timing_logs: false,
        }
    }
}

impl RenderConfig {
    /// Frame budget derived from [`Self::target_fps`].
    #[must_use]
    pub fn target_frame_time(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}

/// Everything `vkclicker.toml` configures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Arena sizes.
    pub memory: RegistryConfig,
    /// Loop settings.
    pub render: RenderConfig,
}

impl AppConfig {
    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed or the memory table is
    /// invalid.
    pub fn from_toml_str(source: &str) -> MemResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: impl AsRef<Path>) -> MemResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(source) => {
                tracing::info!(path = %path.display(), "loaded configuration");
                Self::from_toml_str(&source)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Checks both tables.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::InvalidConfig`] if the memory table is invalid or
    /// the frame-time history is empty.
    pub fn validate(&self) -> MemResult<()> {
        self.memory.validate()?;
        if self.render.history == 0 {
            return Err(MemError::InvalidConfig(
                "render.history must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
