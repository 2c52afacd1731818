use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::extract::Sampling;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Extraction {
    /// A pixel is dark when all of its color channels are below this value.
    pub dark_threshold: u8,
    pub sampling: Sampling,
}

impl Default for Extraction {
    #[tracing::instrument(level = "debug")]
    fn default() -> Self {
        debug!("Creating default extraction settings");
        Self {
            dark_threshold: 64,
            sampling: Sampling::SinglePixel,
        }
    }
}
