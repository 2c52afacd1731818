use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Render {
    /// Output pixels per cell along each axis.
    pub scale: u32,
    /// RGB color of live cells.
    pub foreground: [u8; 3],
    /// RGB color of dead cells.
    pub background: [u8; 3],
}

impl Default for Render {
    /// Black cells on white, magnified 20 times.
    #[tracing::instrument(level = "debug")]
    fn default() -> Self {
        debug!("Creating default render settings");
        Self {
            scale: 20,
            foreground: [0, 0, 0],
            background: [255, 255, 255],
        }
    }
}
