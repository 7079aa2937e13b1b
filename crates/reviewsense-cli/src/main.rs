//! reviewsense CLI
//!
//! Operator front end for the inference layer: classify review texts against
//! a model directory and print the status report the metrics page renders.

use anyhow::Result;
use clap::Parser;
use reviewsense_cli::commands;
use reviewsense_cli::{Cli, Commands};
use reviewsense_inference::InferenceService;
use std::io;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config = commands::load_config(&cli.config, cli.model_dir)?;
    info!(model_dir = %config.model_dir.display(), "Using model directory");

    let service = InferenceService::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Predict { texts } => {
            let texts = if texts.is_empty() {
                commands::read_texts(io::stdin().lock())?
            } else {
                texts
            };
            commands::predict(&service, &texts, &mut out)?;
        }
        Commands::Status => commands::status(&service, &mut out)?,
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("reviewsense=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reviewsense=info"))
    };

    // Logs go to stderr so stdout stays machine-readable
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().with_writer(io::stderr));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
