//! Recovery of the module grid from a rendered QR symbol.
//!
//! The symbol is assumed to be axis aligned, to sit at the same offset from
//! the left and top edges, and to use square modules. Its top-left finder
//! pattern starts with one dark module, followed by a light one, along the
//! main diagonal. Walking that diagonal gives the quiet zone thickness and
//! the module size in source pixels. The grid is then sampled module by
//! module.

use clap::ValueEnum;
use image::{GenericImageView, Pixel, Rgba};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, trace, warn};

use crate::{
    core::{config::extraction::Extraction, matrix::ModuleMatrix},
    error::{ExtractionError, Result},
};

/// How a module's color is decided.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, ValueEnum,
)]
pub enum Sampling {
    /// One pixel at the module's top-left corner.
    #[default]
    SinglePixel,
    /// Majority vote over every pixel of the module. Tolerates anti-aliasing
    /// and specks at the cost of reading the whole image.
    AreaMajority,
}

/// Result of the diagonal probe, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub quiet_zone: u32,
    pub module_size: u32,
}

/// A pixel is dark when every color channel is below `threshold`. Fully
/// transparent pixels are light.
#[must_use]
pub fn is_dark(pixel: Rgba<u8>, threshold: u8) -> bool {
    let [r, g, b, a] = pixel.0;
    a != 0 && r < threshold && g < threshold && b < threshold
}

fn dark_at<I>(image: &I, x: u32, y: u32, threshold: u8) -> bool
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    is_dark(image.get_pixel(x, y).to_rgba(), threshold)
}

/// Walks the main diagonal to find the quiet zone and the module size.
///
/// # Errors
///
/// Returns an error if the image is empty, has no dark pixel on the
/// diagonal, or the module size resolves to zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[tracing::instrument(level = "debug", skip(image))]
pub fn probe_diagonal<I>(image: &I, threshold: u8) -> Result<Probe, ExtractionError>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExtractionError::EmptyImage { width, height });
    }

    let diagonal = f64::from(width).hypot(f64::from(height)).floor() as u32;
    let limit = width.min(height).min(diagonal);

    let quiet_zone = (0..limit)
        .find(|&i| dark_at(image, i, i, threshold))
        .ok_or(ExtractionError::NoDarkPixel { probed: limit })?;

    let run_end = (quiet_zone..limit).find(|&i| !dark_at(image, i, i, threshold));
    let module_size = if let Some(end) = run_end {
        end - quiet_zone
    } else {
        warn!("Diagonal stays dark up to {limit}, module size is ambiguous");
        limit - quiet_zone
    };
    if module_size == 0 {
        return Err(ExtractionError::ZeroModuleSize);
    }

    debug!("Probe: quiet_zone={quiet_zone}px module_size={module_size}px");
    Ok(Probe {
        quiet_zone,
        module_size,
    })
}

/// Reconstructs the module matrix of the QR symbol in `image`.
///
/// # Errors
///
/// Returns `Error::Extraction` if the probe fails or the quiet zone leaves
/// no room for a symbol.
#[allow(clippy::cast_possible_truncation)]
#[tracing::instrument(level = "debug", skip(image), fields(width = image.width(), height = image.height()))]
pub fn extract_modules<I>(image: &I, config: &Extraction) -> Result<ModuleMatrix>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let threshold = config.dark_threshold;
    let Probe {
        quiet_zone,
        module_size,
    } = probe_diagonal(image, threshold)?;
    let (width, height) = image.dimensions();

    let border = quiet_zone.saturating_mul(2);
    let usable_width = width.saturating_sub(border);
    let usable_height = height.saturating_sub(border);
    if usable_width == 0 || usable_height == 0 {
        return Err(ExtractionError::EmptySymbol {
            quiet_zone,
            width,
            height,
        }
        .into());
    }

    let (module_width, module_height) = (module_size, module_size);
    let columns = usable_width.div_ceil(module_width);
    let rows = usable_height.div_ceil(module_height);
    trace!("Sampling {columns}x{rows} modules with {}", config.sampling);

    let matrix = ModuleMatrix::from_fn(columns as usize, rows as usize, |bx, by| {
        let x = quiet_zone + bx as u32 * module_width;
        let y = quiet_zone + by as u32 * module_height;
        match config.sampling {
            Sampling::SinglePixel => dark_at(image, x, y, threshold),
            Sampling::AreaMajority => {
                let x_end = (x + module_width).min(width);
                let y_end = (y + module_height).min(height);
                let total = u64::from(x_end - x) * u64::from(y_end - y);
                let dark = (y..y_end)
                    .flat_map(|py| (x..x_end).map(move |px| (px, py)))
                    .filter(|&(px, py)| dark_at(image, px, py, threshold))
                    .count() as u64;
                dark * 2 > total
            }
        }
    });

    debug!(
        "Extracted {}x{} modules, {} dark",
        matrix.width(),
        matrix.height(),
        matrix.count_set()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, RgbaImage};

    use super::*;
    use crate::{
        core::encode::{ErrorCorrection, QrEncoder, SymbolEncoder},
        error::Error,
        vis::frame::{render_matrix, upscale},
    };

    /// Renders `matrix` with `border` quiet modules of `module_px` pixels.
    fn render_symbol(matrix: &ModuleMatrix, border: usize, module_px: u32) -> Result<GrayImage> {
        upscale(&render_matrix(&matrix.with_quiet_zone(border)), module_px)
    }

    #[test]
    fn dark_classification() {
        assert!(is_dark(Rgba([0, 0, 0, 255]), 64));
        assert!(is_dark(Rgba([63, 10, 20, 255]), 64));
        assert!(!is_dark(Rgba([64, 0, 0, 255]), 64));
        assert!(!is_dark(Rgba([255, 255, 255, 255]), 64));
        assert!(!is_dark(Rgba([0, 0, 0, 0]), 64));
    }

    #[test]
    fn probe_finds_quiet_zone_and_module_size() -> anyhow::Result<()> {
        let symbol = QrEncoder.encode("probe", ErrorCorrection::Medium)?;
        let image = render_symbol(&symbol, 4, 3)?;

        let probe = probe_diagonal(&image, 64)?;

        assert_eq!(
            probe,
            Probe {
                quiet_zone: 12,
                module_size: 3
            }
        );
        Ok(())
    }

    #[test_log::test]
    fn rendered_symbol_round_trips() -> anyhow::Result<()> {
        let symbol = QrEncoder.encode("qr-dance round trip", ErrorCorrection::Quartile)?;
        let image = render_symbol(&symbol, 3, 5)?;

        let extracted = extract_modules(&image, &Extraction::default())?;

        assert_eq!(extracted, symbol);
        Ok(())
    }

    #[test]
    fn round_trip_with_single_pixel_modules() -> anyhow::Result<()> {
        let symbol = QrEncoder.encode("tiny", ErrorCorrection::Low)?;
        let image = render_symbol(&symbol, 2, 1)?;

        assert_eq!(extract_modules(&image, &Extraction::default())?, symbol);
        Ok(())
    }

    #[test]
    fn round_trip_from_rgba_source() -> anyhow::Result<()> {
        let symbol = QrEncoder.encode("rgba", ErrorCorrection::High)?;
        let gray = render_symbol(&symbol, 4, 2)?;
        let rgba = RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
            gray.get_pixel(x, y).to_rgba()
        });

        assert_eq!(extract_modules(&rgba, &Extraction::default())?, symbol);
        Ok(())
    }

    #[test]
    fn area_majority_ignores_specks() -> anyhow::Result<()> {
        let symbol = QrEncoder.encode("speck", ErrorCorrection::Medium)?;
        // Module (7, 7) is the light separator next to the finder pattern.
        assert!(!symbol.get(7, 7));
        let mut image = render_symbol(&symbol, 3, 5)?;
        image.put_pixel(15 + 7 * 5, 15 + 7 * 5, Luma([0]));

        let single = extract_modules(&image, &Extraction::default())?;
        assert!(single.get(7, 7));

        let config = Extraction {
            sampling: Sampling::AreaMajority,
            ..Extraction::default()
        };
        assert_eq!(extract_modules(&image, &config)?, symbol);
        Ok(())
    }

    #[test]
    fn blank_image_has_no_symbol() {
        let image = GrayImage::from_pixel(40, 40, Luma([255]));

        let result = extract_modules(&image, &Extraction::default());

        assert!(matches!(
            result,
            Err(Error::Extraction(ExtractionError::NoDarkPixel { probed: 40 }))
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = GrayImage::new(0, 10);
        assert!(matches!(
            probe_diagonal(&image, 64),
            Err(ExtractionError::EmptyImage { .. })
        ));
    }

    #[test]
    fn all_dark_image_is_a_single_module() -> anyhow::Result<()> {
        let image = GrayImage::from_pixel(12, 12, Luma([0]));

        let matrix = extract_modules(&image, &Extraction::default())?;

        assert_eq!(matrix.width(), 1);
        assert_eq!(matrix.height(), 1);
        assert!(matrix.get(0, 0));
        Ok(())
    }

    #[test]
    fn quiet_zone_covering_the_image_is_rejected() {
        // Dark pixel on the diagonal past the middle of a wide image.
        let mut image = GrayImage::from_pixel(30, 10, Luma([255]));
        image.put_pixel(6, 6, Luma([0]));

        let result = extract_modules(&image, &Extraction::default());

        assert!(matches!(
            result,
            Err(Error::Extraction(ExtractionError::EmptySymbol { quiet_zone: 6, .. }))
        ));
    }
}
