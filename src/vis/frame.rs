use std::ops::Index;

use image::{GrayImage, Luma};
use tracing::trace;

use crate::{
    core::{automaton::Automaton, matrix::ModuleMatrix},
    error::{Error, Result},
};

/// Luma value of live cells and dark modules.
pub const FOREGROUND: Luma<u8> = Luma([0]);
/// Luma value of dead cells and light modules.
pub const BACKGROUND: Luma<u8> = Luma([255]);

/// Renders one pixel per module, set modules in `FOREGROUND`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
#[tracing::instrument(level = "trace", skip_all)]
pub fn render_matrix(matrix: &ModuleMatrix) -> GrayImage {
    GrayImage::from_fn(matrix.width() as u32, matrix.height() as u32, |x, y| {
        if matrix.get(x as usize, y as usize) {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

/// Renders the current generation, one pixel per cell.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[tracing::instrument(level = "trace", skip_all)]
pub fn render_automaton(automaton: &Automaton) -> GrayImage {
    let mut frame = GrayImage::from_pixel(
        automaton.width() as u32,
        automaton.height() as u32,
        BACKGROUND,
    );
    for cell in automaton.grid().iter() {
        // in bounds by the automaton's invariant
        frame.put_pixel(cell.x as u32, cell.y as u32, FOREGROUND);
    }
    frame
}

/// Nearest-neighbour magnification: each pixel becomes a
/// `factor` x `factor` block.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if `factor` is zero or the scaled size
/// overflows `u32`.
#[tracing::instrument(level = "trace", skip(frame))]
pub fn upscale(frame: &GrayImage, factor: u32) -> Result<GrayImage> {
    if factor == 0 {
        return Err(Error::InvalidConfig("scale factor must be positive".into()));
    }
    if factor == 1 {
        return Ok(frame.clone());
    }
    let (width, height) = frame.dimensions();
    let (scaled_width, scaled_height) = scaled_size(width, height, factor)?;
    trace!("Upscaling {width}x{height} by {factor}");
    Ok(GrayImage::from_fn(scaled_width, scaled_height, |x, y| {
        *frame.get_pixel(x / factor, y / factor)
    }))
}

/// Size of a `width` x `height` frame magnified by `factor`.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if either side overflows `u32`.
pub fn scaled_size(width: u32, height: u32, factor: u32) -> Result<(u32, u32)> {
    width
        .checked_mul(factor)
        .zip(height.checked_mul(factor))
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "scale factor {factor} is too large for {width}x{height} frames"
            ))
        })
}

/// Ordered frames of equal size, one per tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<GrayImage>,
}

impl FrameSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Appends a frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameMismatch` if the frame's size differs from the
    /// frames already in the sequence.
    pub fn push(&mut self, frame: GrayImage) -> Result<()> {
        if let Some(expected) = self.dimensions() {
            if frame.dimensions() != expected {
                return Err(Error::FrameMismatch {
                    expected,
                    found: frame.dimensions(),
                });
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Size shared by every frame, `None` while empty.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(GrayImage::dimensions)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&GrayImage> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GrayImage> {
        self.frames.iter()
    }
}

impl Index<usize> for FrameSequence {
    type Output = GrayImage;

    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index]
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a GrayImage;
    type IntoIter = std::slice::Iter<'a, GrayImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
