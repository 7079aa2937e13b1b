use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reviewsense")]
#[command(author, version, about = "Review sentiment inference from a trained model directory")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "reviewsense.yaml")]
    pub config: PathBuf,

    /// Model directory, overrides the configuration file
    #[arg(short, long, global = true, env = "REVIEWSENSE_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify review texts, one JSON result per line
    Predict {
        /// Texts to classify; read one per line from stdin when omitted
        texts: Vec<String>,
    },

    /// Print the model status report as JSON
    Status,
}
