use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, GrayImage, ImageFormat};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Where the picture of a QR code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    File(PathBuf),
    /// Base64 PNG, optionally prefixed with a data URL header.
    Base64(String),
    /// Raw PNG bytes, e.g. piped through stdin.
    Bytes(Vec<u8>),
}

/// Decodes the input into an image.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the payload is not a
/// valid (base64) PNG.
pub fn read_input(input: &Input) -> Result<DynamicImage> {
    match input {
        Input::File(path) => read_png_file(path),
        Input::Base64(payload) => read_png_base64(payload),
        Input::Bytes(bytes) => read_png_bytes(bytes),
    }
}

/// # Errors
///
/// Returns an error if the file cannot be opened or is not a PNG.
#[tracing::instrument(level = "debug")]
pub fn read_png_file(path: &Path) -> Result<DynamicImage> {
    info!("Reading input file: {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    let image = image::load(reader, ImageFormat::Png)?;
    debug!("Decoded PNG from file: {}x{}", image.width(), image.height());
    Ok(image)
}

/// Removes a `data:<mime>;base64,` style header if present. Everything after
/// the first comma is kept, so a payload with further commas fails to decode
/// instead of being silently cut at the second one.
#[must_use]
pub fn strip_data_url_prefix(payload: &str) -> &str {
    payload.split_once(',').map_or(payload, |(_, data)| data)
}

/// # Errors
///
/// Returns an error if the payload is not valid base64 or not a PNG.
#[tracing::instrument(level = "debug", skip(payload), fields(chars = payload.len()))]
pub fn read_png_base64(payload: &str) -> Result<DynamicImage> {
    info!("Reading input from base64 string");
    let stripped = strip_data_url_prefix(payload);
    if stripped.len() != payload.len() {
        debug!("Stripped data URL prefix from base64 input");
    }
    let bytes = STANDARD.decode(stripped.trim())?;
    debug!("Base64 decoded: bytes={}", bytes.len());
    read_png_bytes(&bytes)
}

/// # Errors
///
/// Returns an error if the bytes are not a PNG.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
pub fn read_png_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    debug!("Decoded PNG: {}x{}", image.width(), image.height());
    Ok(image)
}

/// Encodes a frame as PNG bytes.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(frame: &GrayImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    frame.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Writes a single frame as PNG.
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoding fails.
#[tracing::instrument(level = "debug", skip(frame))]
pub fn save_png(frame: &GrayImage, path: &Path) -> Result<()> {
    info!("Saving frame to file: {}", path.display());
    if frame.width() == 0 || frame.height() == 0 {
        return Err(Error::InvalidConfig("cannot save an empty frame".into()));
    }
    frame.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
