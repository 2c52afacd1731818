use serde::{Deserialize, Serialize};
use tracing::debug;

/// Timing of the rendered animation.
///
/// `frame_rate` drives text mode, `frame_delay_ms` drives image mode.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct Animation {
    pub duration_s: f64,
    pub frame_rate: u32,
    pub frame_delay_ms: u32,
    pub initial_frame_delay_ms: u32,
}

impl Default for Animation {
    /// Three seconds at 10 frames per second, no extra delay on the first
    /// frame.
    #[tracing::instrument(level = "debug")]
    fn default() -> Self {
        debug!("Creating default animation");
        Self {
            duration_s: 3.0,
            frame_rate: 10,
            frame_delay_ms: 100,
            initial_frame_delay_ms: 0,
        }
    }
}
