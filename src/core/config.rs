pub mod animation;
pub mod encoder;
pub mod extraction;
pub mod render;

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use self::{animation::Animation, encoder::Encoder, extraction::Extraction, render::Render};
use crate::error::{Error, Result};

/// Struct to hold the configuration for a run.
///
/// Contains fields for:
///
/// - `animation`: Duration and frame timing.
/// - `render`: Scale factor and colors of the frames.
/// - `encoder`: QR encoding parameters (text mode).
/// - `extraction`: QR recovery parameters (image mode).
///
/// Missing sections or keys in a config file fall back to their defaults.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct Config {
    pub animation: Animation,
    pub render: Render,
    pub encoder: Encoder,
    pub extraction: Extraction,
}

impl Default for Config {
    #[must_use]
    #[tracing::instrument(level = "info")]
    fn default() -> Self {
        info!("Creating default config");
        Self {
            animation: Animation::default(),
            render: Render::default(),
            encoder: Encoder::default(),
            extraction: Extraction::default(),
        }
    }
}

impl Config {
    /// Reads a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[tracing::instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Writes the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!("Saving config to {}", path.display());
        let contents = toml::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Checks the values that can never produce a valid animation.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending value.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        let animation = &self.animation;
        if !animation.duration_s.is_finite() || animation.duration_s <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "duration must be positive, got {}",
                animation.duration_s
            )));
        }
        if animation.frame_rate == 0 {
            return Err(Error::InvalidConfig("frame rate must be positive".into()));
        }
        if animation.frame_delay_ms == 0 {
            return Err(Error::InvalidConfig("frame delay must be positive".into()));
        }
        if self.render.scale == 0 {
            return Err(Error::InvalidConfig("scale factor must be positive".into()));
        }
        Ok(())
    }
}
