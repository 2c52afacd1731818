use anyhow::{Context, Result};
use clap::Parser;
use qr_dance::{cli::ImageArgs, core::pipeline::run_image, logging::setup_logging};
use tracing::info;

fn main() {
    if let Err(e) = run_qr_dance_image() {
        eprintln!("qr-dance-image failed: {e:#}");
        std::process::exit(1);
    }
}

#[tracing::instrument(level = "info")]
fn run_qr_dance_image() -> Result<()> {
    let args = ImageArgs::parse();
    let _guard = setup_logging(args.verbose, args.log_dir.as_deref())
        .context("Failed to set up logging for qr-dance-image")?;

    info!("Starting qr-dance-image {}", env!("CARGO_PKG_VERSION"));
    let config = args.to_config().context("Failed to load configuration")?;
    let input = args
        .input(std::io::stdin().lock())
        .context("Failed to read input")?;
    let output = args.output();

    run_image(&input, &config, &output, std::io::stdout().lock())
        .with_context(|| format!("Failed to generate GIF from {}", args.input))?;

    info!("Done");
    Ok(())
}
