use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::encode::ErrorCorrection;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Encoder {
    pub error_correction: ErrorCorrection,
    /// Unset modules added around the symbol before seeding.
    pub quiet_zone: usize,
}

impl Default for Encoder {
    #[tracing::instrument(level = "debug")]
    fn default() -> Self {
        debug!("Creating default encoder settings");
        Self {
            error_correction: ErrorCorrection::Medium,
            quiet_zone: 4,
        }
    }
}
