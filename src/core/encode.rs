use clap::ValueEnum;
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use tracing::{debug, trace};

use crate::{
    core::{config::encoder::Encoder, matrix::ModuleMatrix},
    error::{Error, Result},
};

/// QR error correction level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, ValueEnum,
)]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => Self::L,
            ErrorCorrection::Medium => Self::M,
            ErrorCorrection::Quartile => Self::Q,
            ErrorCorrection::High => Self::H,
        }
    }
}

/// Turns text into a QR module matrix without any quiet zone.
pub trait SymbolEncoder {
    /// # Errors
    ///
    /// Returns `Error::Encode` if the data does not fit a symbol at the
    /// requested level.
    fn encode(&self, text: &str, level: ErrorCorrection) -> Result<ModuleMatrix>;
}

/// `SymbolEncoder` backed by the `qrcode` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrEncoder;

impl SymbolEncoder for QrEncoder {
    #[tracing::instrument(level = "trace", skip(self, text))]
    fn encode(&self, text: &str, level: ErrorCorrection) -> Result<ModuleMatrix> {
        trace!("Encoding {} bytes", text.len());
        let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::from(level))
            .map_err(|e| Error::Encode(e.to_string()))?;
        let width = code.width();
        let colors = code.to_colors();
        Ok(ModuleMatrix::from_fn(width, width, |x, y| {
            matches!(colors[y * width + x], Color::Dark)
        }))
    }
}

/// Encodes `text` and surrounds the symbol with the configured quiet zone,
/// producing the seed for text mode.
///
/// # Errors
///
/// Propagates the encoder's failure.
#[tracing::instrument(level = "debug", skip(encoder, text))]
pub fn seed_from_text<E: SymbolEncoder>(
    encoder: &E,
    text: &str,
    config: &Encoder,
) -> Result<ModuleMatrix> {
    let symbol = encoder.encode(text, config.error_correction)?;
    let seed = symbol.with_quiet_zone(config.quiet_zone);
    debug!(
        "QR symbol {}x{}, seed {}x{} with {} dark modules",
        symbol.width(),
        symbol.height(),
        seed.width(),
        seed.height(),
        seed.count_set()
    );
    Ok(seed)
}
