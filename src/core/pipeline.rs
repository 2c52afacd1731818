use std::{fs, io::Write, path::PathBuf};

use tracing::{debug, info, trace};

use crate::{
    core::{
        automaton::Automaton,
        config::{animation::Animation, Config},
        encode::{seed_from_text, SymbolEncoder},
        extract::extract_modules,
        matrix::ModuleMatrix,
    },
    error::{Error, Result},
    vis::{
        frame::{render_automaton, scaled_size, upscale, FrameSequence},
        gif::{encode_gif_to_vec, to_base64, FrameTiming, Palette},
        png::{read_input, Input},
    },
};

/// Upper bound on ticks per run, an hour at 30 frames per second.
pub const MAX_TICKS: usize = 108_000;

/// Largest frame side a GIF can describe.
pub const MAX_FRAME_SIDE: u32 = 65_535;

/// Frames reserved up front; longer runs grow the sequence as they go.
const PREALLOCATED_FRAMES: usize = 256;

/// Where the finished GIF goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    File(PathBuf),
    /// Base64 text on the provided writer, usually stdout.
    Base64,
}

/// Number of ticks and the timing of their frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub total_ticks: usize,
    pub timing: FrameTiming,
}

impl Schedule {
    /// Text mode: `ceil(duration * frame_rate)` ticks, each shown for
    /// `round(1000 / frame_rate)` ms.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if either value is not positive.
    pub fn from_frame_rate(animation: &Animation) -> Result<Self> {
        Ok(Self {
            total_ticks: ticks_from_frame_rate(animation.duration_s, animation.frame_rate)?,
            timing: FrameTiming {
                frame_delay_ms: frame_delay_from_rate(animation.frame_rate)?,
                initial_frame_delay_ms: animation.initial_frame_delay_ms,
            },
        })
    }

    /// Image mode: `round(duration * 1000 / frame_delay)` ticks of
    /// `frame_delay_ms` each.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if either value is not positive.
    pub fn from_frame_delay(animation: &Animation) -> Result<Self> {
        Ok(Self {
            total_ticks: ticks_from_frame_delay(animation.duration_s, animation.frame_delay_ms)?,
            timing: FrameTiming {
                frame_delay_ms: animation.frame_delay_ms,
                initial_frame_delay_ms: animation.initial_frame_delay_ms,
            },
        })
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bounded_ticks(ticks: f64) -> Result<usize> {
    if !ticks.is_finite() || ticks < 1.0 {
        return Err(Error::InvalidConfig(format!(
            "total ticks must be greater than 0, got {ticks}"
        )));
    }
    if ticks > MAX_TICKS as f64 {
        return Err(Error::InvalidConfig(format!(
            "total ticks must be at most {MAX_TICKS}, got {ticks}"
        )));
    }
    Ok(ticks as usize)
}

/// # Errors
///
/// Returns `Error::InvalidConfig` if the tick count is not positive or
/// exceeds [`MAX_TICKS`].
pub fn ticks_from_frame_rate(duration_s: f64, frame_rate: u32) -> Result<usize> {
    bounded_ticks((duration_s * f64::from(frame_rate)).ceil())
}

/// # Errors
///
/// Returns `Error::InvalidConfig` if the delay is zero or the tick count is
/// not positive or exceeds [`MAX_TICKS`].
pub fn ticks_from_frame_delay(duration_s: f64, frame_delay_ms: u32) -> Result<usize> {
    if frame_delay_ms == 0 {
        return Err(Error::InvalidConfig("frame delay must be greater than 0".into()));
    }
    bounded_ticks((duration_s * 1000.0 / f64::from(frame_delay_ms)).round())
}

/// Milliseconds per frame at `frame_rate` frames per second, rounded.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if the frame rate is zero or so high that
/// the delay rounds to zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn frame_delay_from_rate(frame_rate: u32) -> Result<u32> {
    if frame_rate == 0 {
        return Err(Error::InvalidConfig("frame rate must be greater than 0".into()));
    }
    let delay = (1000.0 / f64::from(frame_rate)).round() as u32;
    if delay == 0 {
        return Err(Error::InvalidConfig(format!(
            "frame delay must be greater than 0, got {delay} at {frame_rate} fps"
        )));
    }
    Ok(delay)
}

/// Seeds an automaton with `seed` and captures `total_ticks` frames. Each
/// frame is taken before its step, so the first frame is the seed itself.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if `scale` is zero or the scaled frames
/// would not fit in a GIF. Both are checked before any frame is rendered.
#[tracing::instrument(level = "debug", skip(seed), fields(width = seed.width(), height = seed.height()))]
pub fn simulate(seed: &ModuleMatrix, total_ticks: usize, scale: u32) -> Result<FrameSequence> {
    debug!("Simulation start: total_ticks={total_ticks} scale={scale}");
    check_frame_size(seed, scale)?;
    let mut automaton = Automaton::from_matrix(seed);
    let mut frames = FrameSequence::with_capacity(total_ticks.min(PREALLOCATED_FRAMES));

    for tick in 0..total_ticks {
        frames.push(upscale(&render_automaton(&automaton), scale)?)?;

        let delta = automaton.step();
        if tick < 5 || tick % 50 == 0 {
            trace!(
                "tick={tick} added={} removed={}",
                delta.added.len(),
                delta.removed.len()
            );
        }
    }

    debug!("Simulation end: frames={}", frames.len());
    Ok(frames)
}

/// Checks that frames of `seed` magnified by `scale` stay within the GIF
/// size limit.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if `scale` is zero or either side of the
/// scaled frame exceeds [`MAX_FRAME_SIDE`].
pub fn check_frame_size(seed: &ModuleMatrix, scale: u32) -> Result<(u32, u32)> {
    if scale == 0 {
        return Err(Error::InvalidConfig("scale factor must be positive".into()));
    }
    let too_large = || {
        Error::InvalidConfig(format!(
            "{}x{} modules at scale {scale} exceed the GIF limit of {MAX_FRAME_SIDE} pixels",
            seed.width(),
            seed.height()
        ))
    };
    let width = u32::try_from(seed.width()).map_err(|_| too_large())?;
    let height = u32::try_from(seed.height()).map_err(|_| too_large())?;
    let (width, height) = scaled_size(width, height, scale).map_err(|_| too_large())?;
    if width > MAX_FRAME_SIDE || height > MAX_FRAME_SIDE {
        return Err(too_large());
    }
    Ok((width, height))
}

/// Simulates and encodes a complete GIF in memory.
///
/// # Errors
///
/// Returns an error if simulation or encoding fails.
#[tracing::instrument(level = "info", skip(seed, config))]
pub fn render_gif(seed: &ModuleMatrix, schedule: Schedule, config: &Config) -> Result<Vec<u8>> {
    info!("Running simulation for {} ticks", schedule.total_ticks);
    let frames = simulate(seed, schedule.total_ticks, config.render.scale)?;
    info!("Preparing GIF from {} frames", frames.len());
    encode_gif_to_vec(&frames, schedule.timing, &Palette::from(&config.render))
}

/// Writes a finished GIF. Nothing is created or written before this point,
/// so a failed run leaves no partial output behind.
///
/// # Errors
///
/// Returns an error if the file or the writer fails.
#[tracing::instrument(level = "info", skip(gif, stdout), fields(bytes = gif.len()))]
pub fn deliver<W: Write>(gif: &[u8], output: &Output, mut stdout: W) -> Result<()> {
    match output {
        Output::File(path) => {
            info!("Writing GIF to file: {}", path.display());
            fs::write(path, gif)?;
            info!("GIF written to file successfully");
        }
        Output::Base64 => {
            let encoded = to_base64(gif);
            stdout.write_all(encoded.as_bytes())?;
            stdout.flush()?;
            info!("Base64 encoded GIF written to stdout");
        }
    }
    Ok(())
}

/// Text mode: QR-encodes `text` and animates it.
///
/// # Errors
///
/// Returns the first configuration, encoding or I/O error.
#[tracing::instrument(level = "info", skip(encoder, text, config, stdout))]
pub fn run_text<E, W>(
    encoder: &E,
    text: &str,
    config: &Config,
    output: &Output,
    stdout: W,
) -> Result<()>
where
    E: SymbolEncoder,
    W: Write,
{
    config.validate()?;
    let schedule = Schedule::from_frame_rate(&config.animation)?;
    info!(
        "Total ticks: {}, frame delay: {}ms",
        schedule.total_ticks, schedule.timing.frame_delay_ms
    );

    info!("Generating QR code bitmap");
    let seed = seed_from_text(encoder, text, &config.encoder)?;
    trace!("Seed:\n{seed}");

    let gif = render_gif(&seed, schedule, config)?;
    deliver(&gif, output, stdout)
}

/// Image mode: recovers the QR modules from a picture and animates them.
///
/// # Errors
///
/// Returns the first configuration, decoding, extraction or I/O error.
#[tracing::instrument(level = "info", skip(input, config, stdout))]
pub fn run_image<W: Write>(
    input: &Input,
    config: &Config,
    output: &Output,
    stdout: W,
) -> Result<()> {
    config.validate()?;
    let schedule = Schedule::from_frame_delay(&config.animation)?;
    info!(
        "Total ticks: {}, frame delay: {}ms",
        schedule.total_ticks, schedule.timing.frame_delay_ms
    );

    let image = read_input(input)?;
    let seed = extract_modules(&image, &config.extraction)?;
    trace!("Seed:\n{seed}");

    let gif = render_gif(&seed, schedule, config)?;
    deliver(&gif, output, stdout)
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine};

    use super::*;
    use crate::{
        core::encode::{ErrorCorrection, QrEncoder},
        tests::prepare_files,
        vis::{
            frame::{render_matrix, BACKGROUND, FOREGROUND},
            png::{encode_png, save_png},
        },
    };

    const COMMON_PATH: &str = "tests/core/pipeline";

    fn small_config() -> Config {
        let mut config = Config::default();
        config.animation.duration_s = 0.5;
        config.render.scale = 2;
        config
    }

    fn gif_frame_count(bytes: &[u8]) -> anyhow::Result<usize> {
        let mut decoder = gif::DecodeOptions::new().read_info(bytes)?;
        let mut count = 0;
        while decoder.read_next_frame()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    #[test]
    fn tick_arithmetic() -> anyhow::Result<()> {
        assert_eq!(ticks_from_frame_rate(3.0, 10)?, 30);
        assert_eq!(ticks_from_frame_rate(0.25, 10)?, 3);
        assert_eq!(ticks_from_frame_delay(3.0, 100)?, 30);
        assert_eq!(ticks_from_frame_delay(1.0, 300)?, 3);
        assert_eq!(frame_delay_from_rate(10)?, 100);
        assert_eq!(frame_delay_from_rate(3)?, 333);
        assert_eq!(frame_delay_from_rate(15)?, 67);
        Ok(())
    }

    #[test]
    fn non_positive_ticks_are_config_errors() {
        assert!(matches!(ticks_from_frame_rate(0.0, 10), Err(Error::InvalidConfig(_))));
        assert!(matches!(ticks_from_frame_rate(-1.0, 10), Err(Error::InvalidConfig(_))));
        assert!(matches!(ticks_from_frame_delay(0.01, 1000), Err(Error::InvalidConfig(_))));
        assert!(matches!(ticks_from_frame_delay(1.0, 0), Err(Error::InvalidConfig(_))));
        assert!(matches!(frame_delay_from_rate(0), Err(Error::InvalidConfig(_))));
        assert!(matches!(frame_delay_from_rate(5000), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn huge_durations_are_config_errors() -> anyhow::Result<()> {
        assert!(matches!(ticks_from_frame_rate(1e12, 10), Err(Error::InvalidConfig(_))));
        assert!(matches!(ticks_from_frame_delay(1e12, 100), Err(Error::InvalidConfig(_))));
        assert_eq!(ticks_from_frame_rate(3600.0, 30)?, MAX_TICKS);

        let mut config = small_config();
        config.animation.duration_s = 1e12;
        assert!(config.validate().is_ok());
        let mut stdout = Vec::new();
        let result = run_text(&QrEncoder, "long", &config, &Output::Base64, &mut stdout);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert!(stdout.is_empty());
        Ok(())
    }

    #[test]
    fn oversized_frames_are_rejected_before_simulating() -> anyhow::Result<()> {
        let seed = ModuleMatrix::new(29, 29);

        assert_eq!(check_frame_size(&seed, 2_259)?, (65_511, 65_511));
        assert!(matches!(simulate(&seed, 1_000, 3_000), Err(Error::InvalidConfig(_))));
        assert!(matches!(simulate(&seed, 1, 148_102_321), Err(Error::InvalidConfig(_))));
        assert!(matches!(check_frame_size(&seed, 0), Err(Error::InvalidConfig(_))));

        let tall = ModuleMatrix::new(1, 70_000);
        assert!(matches!(check_frame_size(&tall, 1), Err(Error::InvalidConfig(_))));
        Ok(())
    }

    #[test]
    fn schedules() -> anyhow::Result<()> {
        let mut animation = Animation::default();
        animation.initial_frame_delay_ms = 2000;

        let schedule = Schedule::from_frame_rate(&animation)?;
        assert_eq!(schedule.total_ticks, 30);
        assert_eq!(schedule.timing.frame_delay_ms, 100);
        assert_eq!(schedule.timing.initial_frame_delay_ms, 2000);

        animation.frame_delay_ms = 250;
        let schedule = Schedule::from_frame_delay(&animation)?;
        assert_eq!(schedule.total_ticks, 12);
        assert_eq!(schedule.timing.frame_delay_ms, 250);
        Ok(())
    }

    #[test]
    fn first_frame_is_the_seed() -> anyhow::Result<()> {
        let seed = ModuleMatrix::from_rows(&[
            vec![false, true, false],
            vec![false, true, false],
            vec![false, true, false],
        ])?;

        let frames = simulate(&seed, 3, 1)?;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], render_matrix(&seed));
        assert_eq!(*frames[1].get_pixel(0, 1), FOREGROUND);
        assert_eq!(*frames[1].get_pixel(1, 0), BACKGROUND);
        assert_eq!(frames[2], frames[0]);
        Ok(())
    }

    #[test]
    fn frames_are_upscaled() -> anyhow::Result<()> {
        let seed = ModuleMatrix::new(4, 3);
        let frames = simulate(&seed, 2, 5)?;
        assert_eq!(frames.dimensions(), Some((20, 15)));
        Ok(())
    }

    #[test]
    fn zero_scale_is_rejected() {
        let seed = ModuleMatrix::new(2, 2);
        assert!(matches!(simulate(&seed, 1, 0), Err(Error::InvalidConfig(_))));
    }

    #[test_log::test]
    fn text_mode_writes_base64_gif() -> anyhow::Result<()> {
        let mut config = small_config();
        config.encoder.error_correction = ErrorCorrection::Low;
        let mut stdout = Vec::new();

        run_text(&QrEncoder, "hello", &config, &Output::Base64, &mut stdout)?;

        let gif = STANDARD.decode(&stdout)?;
        assert_eq!(gif_frame_count(&gif)?, 5);
        let decoder = gif::DecodeOptions::new().read_info(&gif[..])?;
        assert_eq!(decoder.width(), (21 + 8) * 2);
        Ok(())
    }

    #[test]
    fn text_mode_writes_file() -> anyhow::Result<()> {
        let files = prepare_files(COMMON_PATH, &["text_mode.gif"])?;

        run_text(
            &QrEncoder,
            "qr-dance",
            &small_config(),
            &Output::File(files[0].clone()),
            std::io::sink(),
        )?;

        assert!(files[0].is_file());
        assert_eq!(gif_frame_count(&std::fs::read(&files[0])?)?, 5);
        Ok(())
    }

    #[test]
    fn failed_run_leaves_no_output() -> anyhow::Result<()> {
        let files = prepare_files(COMMON_PATH, &["never_written.gif"])?;
        // Far beyond the capacity of a version 40 symbol.
        let text = "x".repeat(8000);
        let config = small_config();
        let mut stdout = Vec::new();

        let to_file = run_text(
            &QrEncoder,
            &text,
            &config,
            &Output::File(files[0].clone()),
            std::io::sink(),
        );
        let to_stdout = run_text(&QrEncoder, &text, &config, &Output::Base64, &mut stdout);

        assert!(matches!(to_file, Err(Error::Encode(_))));
        assert!(matches!(to_stdout, Err(Error::Encode(_))));
        assert!(!files[0].exists());
        assert!(stdout.is_empty());
        Ok(())
    }

    #[test]
    fn image_mode_round_trips_a_rendered_symbol() -> anyhow::Result<()> {
        let files = prepare_files(COMMON_PATH, &["symbol.png", "image_mode.gif"])?;

        let symbol = QrEncoder.encode("image mode", ErrorCorrection::Medium)?;
        let picture = upscale(&render_matrix(&symbol.with_quiet_zone(4)), 6)?;
        save_png(&picture, &files[0])?;

        let mut config = small_config();
        config.animation.frame_delay_ms = 100;
        run_image(
            &Input::File(files[0].clone()),
            &config,
            &Output::File(files[1].clone()),
            std::io::sink(),
        )?;

        let gif = std::fs::read(&files[1])?;
        let decoder = gif::DecodeOptions::new().read_info(&gif[..])?;
        assert_eq!(
            u32::from(decoder.width()),
            u32::try_from(symbol.width())? * config.render.scale
        );
        assert_eq!(gif_frame_count(&gif)?, 5);
        Ok(())
    }

    #[test]
    fn image_mode_accepts_base64_input() -> anyhow::Result<()> {
        let symbol = QrEncoder.encode("b64", ErrorCorrection::Low)?;
        let picture = upscale(&render_matrix(&symbol.with_quiet_zone(2)), 3)?;
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(encode_png(&picture)?));
        let mut stdout = Vec::new();

        run_image(&Input::Base64(payload), &small_config(), &Output::Base64, &mut stdout)?;

        let gif = STANDARD.decode(&stdout)?;
        let decoder = gif::DecodeOptions::new().read_info(&gif[..])?;
        assert_eq!(usize::from(decoder.width()), symbol.width() * 2);
        Ok(())
    }

    #[test]
    fn image_mode_reports_missing_symbol() -> anyhow::Result<()> {
        let blank = image::GrayImage::from_pixel(30, 30, BACKGROUND);
        let payload = STANDARD.encode(encode_png(&blank)?);
        let mut stdout = Vec::new();

        let result = run_image(&Input::Base64(payload), &small_config(), &Output::Base64, &mut stdout);

        assert!(matches!(result, Err(Error::Extraction(_))));
        assert!(stdout.is_empty());
        Ok(())
    }
}
