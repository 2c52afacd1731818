use thiserror::Error;

/// Errors surfaced by a qr-dance run.
///
/// None of these are recovered locally; every variant aborts the run
/// before any output is produced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to encode data as a QR code: {0}")]
    Encode(String),

    #[error("failed to decode base64 input: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to decode input: {0}")]
    Decode(String),

    #[error("QR extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("frame is {found:?}, sequence frames are {expected:?}")]
    FrameMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("failed to encode GIF: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("failed to parse config file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reasons the diagonal probe can fail to recover a module grid.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ExtractionError {
    #[error("image is {width}x{height}, nothing to probe")]
    EmptyImage { width: u32, height: u32 },

    #[error("no dark pixel found along the first {probed} diagonal pixels, quiet zone covers the whole image")]
    NoDarkPixel { probed: u32 },

    #[error("module size resolved to zero")]
    ZeroModuleSize,

    #[error("quiet zone of {quiet_zone} px leaves no symbol area in a {width}x{height} image")]
    EmptySymbol {
        quiet_zone: u32,
        width: u32,
        height: u32,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
