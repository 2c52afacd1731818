use std::{
    io::Read,
    path::{Path, PathBuf},
};

use clap::{ArgAction, Parser};
use tracing::{debug, info};

use crate::{
    core::{config::Config, encode::ErrorCorrection, extract::Sampling, pipeline::Output},
    error::Result,
    vis::png::Input,
};

/// Reads the payload from stdin when given as the input.
pub const STDIN_MARKER: &str = "-";

/// Generate a Game of Life GIF that starts from a QR code.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "qr-dance", version)]
pub struct TextArgs {
    /// Data to be encoded in the QR code
    pub data: String,

    /// Duration of the animation in seconds [default: 3]
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Frame rate of the animation in frames per second [default: 10]
    #[arg(short, long)]
    pub frame_rate: Option<u32>,

    /// Path to the output GIF file
    #[arg(short, long, default_value = "output.gif")]
    pub output: PathBuf,

    /// Write the GIF as base64 to stdout instead of a file
    #[arg(short, long)]
    pub base64: bool,

    /// Scale factor for the output GIF [default: 20]
    #[arg(short, long)]
    pub scale: Option<u32>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Delay of the first frame in milliseconds, 0 keeps the regular delay
    #[arg(long)]
    pub initial_frame_delay: Option<u32>,

    /// Error correction level of the QR code [default: medium]
    #[arg(long, value_enum)]
    pub error_correction: Option<ErrorCorrection>,

    /// TOML configuration file, flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Additionally write logs to daily files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl TextArgs {
    /// Builds the run configuration from the optional file and the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = base_config(self.config.as_deref())?;
        let animation = &mut config.animation;
        override_with(&mut animation.duration_s, self.duration);
        override_with(&mut animation.frame_rate, self.frame_rate);
        override_with(&mut animation.initial_frame_delay_ms, self.initial_frame_delay);
        override_with(&mut config.render.scale, self.scale);
        override_with(&mut config.encoder.error_correction, self.error_correction);
        debug!("Effective configuration: {config:?}");
        Ok(config)
    }

    #[must_use]
    pub fn output(&self) -> Output {
        select_output(self.base64, &self.output)
    }
}

/// Generate a Game of Life GIF that starts from a picture of a QR code.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "qr-dance-image", version)]
pub struct ImageArgs {
    /// PNG file, or base64 PNG with --base64-input. `-` reads from stdin
    pub input: String,

    /// Duration of the animation in seconds [default: 3]
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Delay between frames in milliseconds [default: 100]
    #[arg(long)]
    pub frame_delay: Option<u32>,

    /// Path to the output GIF file
    #[arg(short, long, default_value = "output.gif")]
    pub output: PathBuf,

    /// Write the GIF as base64 to stdout instead of a file
    #[arg(short, long)]
    pub base64: bool,

    /// Treat the input as a base64 encoded PNG
    #[arg(long)]
    pub base64_input: bool,

    /// Scale factor for the output GIF [default: 20]
    #[arg(short, long)]
    pub scale: Option<u32>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Delay of the first frame in milliseconds, 0 keeps the regular delay
    #[arg(long)]
    pub initial_frame_delay: Option<u32>,

    /// How module colors are sampled [default: single-pixel]
    #[arg(long, value_enum)]
    pub sampling: Option<Sampling>,

    /// TOML configuration file, flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Additionally write logs to daily files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl ImageArgs {
    /// Builds the run configuration from the optional file and the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = base_config(self.config.as_deref())?;
        let animation = &mut config.animation;
        override_with(&mut animation.duration_s, self.duration);
        override_with(&mut animation.frame_delay_ms, self.frame_delay);
        override_with(&mut animation.initial_frame_delay_ms, self.initial_frame_delay);
        override_with(&mut config.render.scale, self.scale);
        override_with(&mut config.extraction.sampling, self.sampling);
        debug!("Effective configuration: {config:?}");
        Ok(config)
    }

    #[must_use]
    pub fn output(&self) -> Output {
        select_output(self.base64, &self.output)
    }

    /// Resolves the input argument, reading `stdin` only when the input is
    /// [`STDIN_MARKER`].
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read.
    pub fn input<R: Read>(&self, mut stdin: R) -> Result<Input> {
        if self.input == STDIN_MARKER {
            info!("Reading input from stdin");
            if self.base64_input {
                let mut payload = String::new();
                stdin.read_to_string(&mut payload)?;
                return Ok(Input::Base64(payload));
            }
            let mut bytes = Vec::new();
            stdin.read_to_end(&mut bytes)?;
            return Ok(Input::Bytes(bytes));
        }
        if self.base64_input {
            Ok(Input::Base64(self.input.clone()))
        } else {
            Ok(Input::File(PathBuf::from(&self.input)))
        }
    }
}

fn base_config(path: Option<&Path>) -> Result<Config> {
    path.map_or_else(|| Ok(Config::default()), Config::load)
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn select_output(base64: bool, path: &Path) -> Output {
    if base64 {
        Output::Base64
    } else {
        Output::File(path.to_path_buf())
    }
}
