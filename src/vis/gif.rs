use std::{borrow::Cow, io::Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use gif::{Encoder, Frame, Repeat};
use tracing::{debug, trace};

use crate::{
    core::config::render::Render,
    error::{Error, Result},
    vis::frame::FrameSequence,
};

/// Luma values below this map to the foreground palette entry.
const FOREGROUND_CUTOFF: u8 = 128;

/// Two-entry GIF palette: index 0 is the background, index 1 the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub foreground: [u8; 3],
    pub background: [u8; 3],
}

impl Palette {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 6] {
        let [br, bg, bb] = self.background;
        let [fr, fg, fb] = self.foreground;
        [br, bg, bb, fr, fg, fb]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from(&Render::default())
    }
}

impl From<&Render> for Palette {
    fn from(render: &Render) -> Self {
        Self {
            foreground: render.foreground,
            background: render.background,
        }
    }
}

/// Per-frame delays in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub frame_delay_ms: u32,
    /// Overrides the first frame's delay when positive.
    pub initial_frame_delay_ms: u32,
}

impl FrameTiming {
    /// Delay of frame `index` in hundredths of a second, the GIF time unit.
    #[must_use]
    pub fn delay_cs(&self, index: usize) -> u16 {
        let delay_ms = if index == 0 && self.initial_frame_delay_ms > 0 {
            self.initial_frame_delay_ms
        } else {
            self.frame_delay_ms
        };
        u16::try_from(delay_ms / 10).unwrap_or(u16::MAX)
    }
}

/// Encodes the frames as an infinitely looping two-color GIF into `out`
/// and returns the writer once the trailer has been written.
///
/// # Errors
///
/// Returns an error if there are no frames, the frames exceed the GIF size
/// limit, or writing fails.
#[tracing::instrument(level = "debug", skip(frames, out), fields(frames = frames.len()))]
pub fn encode_gif<W: Write>(
    frames: &FrameSequence,
    timing: FrameTiming,
    palette: &Palette,
    out: W,
) -> Result<W> {
    let (width, height) = frames
        .dimensions()
        .ok_or_else(|| Error::InvalidConfig("no frames to encode".into()))?;
    let too_large = || Error::InvalidConfig(format!("{width}x{height} frames exceed the GIF size limit"));
    let gif_width = u16::try_from(width).map_err(|_| too_large())?;
    let gif_height = u16::try_from(height).map_err(|_| too_large())?;

    debug!(
        "Encoding GIF: frames={} size={width}x{height} delay={}ms initial_delay={}ms",
        frames.len(),
        timing.frame_delay_ms,
        timing.initial_frame_delay_ms
    );

    let mut encoder = Encoder::new(out, gif_width, gif_height, &palette.to_bytes())?;
    encoder.set_repeat(Repeat::Infinite)?;

    for (index, image) in frames.iter().enumerate() {
        let indices: Vec<u8> = image
            .pixels()
            .map(|pixel| u8::from(pixel[0] < FOREGROUND_CUTOFF))
            .collect();
        let frame = Frame {
            width: gif_width,
            height: gif_height,
            delay: timing.delay_cs(index),
            buffer: Cow::Owned(indices),
            ..Frame::default()
        };
        encoder.write_frame(&frame)?;
        if index < 3 || index + 1 == frames.len() {
            trace!("Encoded frame {}/{}", index + 1, frames.len());
        }
    }

    Ok(encoder.into_inner()?)
}

/// Encodes the frames into an in-memory GIF.
///
/// # Errors
///
/// See [`encode_gif`].
pub fn encode_gif_to_vec(
    frames: &FrameSequence,
    timing: FrameTiming,
    palette: &Palette,
) -> Result<Vec<u8>> {
    encode_gif(frames, timing, palette, Vec::new())
}

/// Standard base64 with padding.
#[must_use]
#[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
pub fn to_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    debug!("Base64 encoding complete: chars={}", encoded.len());
    encoded
}
