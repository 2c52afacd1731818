use anyhow::{Context, Result};
use clap::Parser;
use qr_dance::{
    cli::TextArgs,
    core::{encode::QrEncoder, pipeline::run_text},
    logging::setup_logging,
};
use tracing::info;

fn main() {
    if let Err(e) = run_qr_dance() {
        eprintln!("qr-dance failed: {e:#}");
        std::process::exit(1);
    }
}

#[tracing::instrument(level = "info")]
fn run_qr_dance() -> Result<()> {
    let args = TextArgs::parse();
    let _guard = setup_logging(args.verbose, args.log_dir.as_deref())
        .context("Failed to set up logging for qr-dance")?;

    info!("Starting qr-dance {}", env!("CARGO_PKG_VERSION"));
    let config = args.to_config().context("Failed to load configuration")?;
    let output = args.output();

    run_text(&QrEncoder, &args.data, &config, &output, std::io::stdout().lock())
        .context("Failed to generate GIF from text")?;

    info!("Done");
    Ok(())
}
